//! The `data` frame payload and its conversion into map markers.
//!
//! Upstream services are not consistent about field names: place search
//! results use `lat`/`lng` and `name`, tourism POIs use `mapy`/`mapx` and
//! `title`, and coordinates sometimes arrive as strings. Route results carry
//! no places at all, only sub-path endpoints (`startX`/`startY`,
//! `endX`/`endY`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use beaty_core::types::{Intent, LatLng, Marker, MarkerSet};

/// Result data delivered with a `data` frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPayload {
    pub places: Option<Vec<Value>>,
    pub pois: Option<Vec<Value>>,
    pub routes: Option<Vec<Value>>,
    pub poi: Option<Value>,
    pub count: Option<u64>,
    pub search_keyword: Option<String>,
    /// Pipeline diagnostics, only present in test mode.
    pub steps: Option<Value>,
}

impl DataPayload {
    /// Build the marker set this payload implies for `intent`.
    ///
    /// Items without usable coordinates are skipped. Ordered result lists are
    /// ranked 1.. in the order they appear in the returned set, unless an item
    /// carries its own `rank`.
    pub fn markers(&self, intent: Intent) -> MarkerSet {
        match intent {
            Intent::Route => self.route_markers(),
            Intent::Random => {
                let single = self
                    .poi
                    .as_ref()
                    .and_then(|poi| marker_from_item(poi, None));
                match single {
                    Some(marker) => MarkerSet::new(vec![marker]),
                    None => ranked(self.first_list(&[&self.pois, &self.places])),
                }
            }
            Intent::FindPlace => ranked(self.first_list(&[&self.places, &self.pois])),
            Intent::Recommend | Intent::Landmark => {
                ranked(self.first_list(&[&self.pois, &self.places]))
            }
            Intent::GeneralChat => MarkerSet::empty(),
        }
    }

    fn first_list<'a>(&'a self, candidates: &[&'a Option<Vec<Value>>]) -> &'a [Value] {
        candidates
            .iter()
            .filter_map(|c| Option::as_deref(*c))
            .find(|list| !list.is_empty())
            .unwrap_or(&[])
    }

    fn route_markers(&self) -> MarkerSet {
        let Some(route) = self.routes.as_ref().and_then(|r| r.first()) else {
            return MarkerSet::empty();
        };
        let Some(sub_paths) = route.get("subPath").and_then(Value::as_array) else {
            return MarkerSet::empty();
        };

        let mut markers = Vec::new();
        let start = sub_paths.iter().find_map(|sp| {
            let obj = sp.as_object()?;
            endpoint(obj, "startX", "startY", "startName")
        });
        let end = sub_paths.iter().rev().find_map(|sp| {
            let obj = sp.as_object()?;
            endpoint(obj, "endX", "endY", "endName")
        });
        markers.extend(start);
        markers.extend(end);
        MarkerSet::new(markers)
    }
}

fn ranked(items: &[Value]) -> MarkerSet {
    let mut markers: Vec<Marker> = Vec::with_capacity(items.len());
    for item in items {
        let rank = markers.len() as u32 + 1;
        if let Some(marker) = marker_from_item(item, Some(rank)) {
            markers.push(marker);
        }
    }
    MarkerSet::new(markers)
}

fn marker_from_item(item: &Value, rank: Option<u32>) -> Option<Marker> {
    let obj = item.as_object()?;
    let lat = number(obj, "lat").or_else(|| number(obj, "mapy"))?;
    let lng = number(obj, "lng").or_else(|| number(obj, "mapx"))?;
    let position = LatLng::new(lat, lng);
    if !position.is_usable() {
        return None;
    }
    // An explicit rank from the server wins over list position.
    let rank = rank.map(|r| {
        number(obj, "rank")
            .filter(|n| *n >= 1.0)
            .map(|n| n as u32)
            .unwrap_or(r)
    });
    Some(Marker {
        position,
        rank,
        label: text(obj, "name").or_else(|| text(obj, "title")),
    })
}

fn endpoint(obj: &Map<String, Value>, x: &str, y: &str, name: &str) -> Option<Marker> {
    let position = LatLng::new(number(obj, y)?, number(obj, x)?);
    if !position.is_usable() {
        return None;
    }
    Some(Marker {
        position,
        rank: None,
        label: text(obj, name),
    })
}

fn number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> DataPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_find_place_uses_lat_lng_and_name() {
        let p = payload(json!({
            "places": [
                {"name": "Cafe A", "lat": 37.50, "lng": 127.02},
                {"name": "Cafe B", "lat": 37.51, "lng": 127.03}
            ]
        }));
        let set = p.markers(Intent::FindPlace);
        assert_eq!(set.len(), 2);
        let first = set.first().unwrap();
        assert_eq!(first.rank, Some(1));
        assert_eq!(first.label.as_deref(), Some("Cafe A"));
        assert_eq!(first.position, LatLng::new(37.50, 127.02));
    }

    #[test]
    fn test_recommend_uses_mapx_mapy_and_title() {
        let p = payload(json!({
            "pois": [
                {"title": "Palace", "mapx": "126.977", "mapy": "37.579"},
                {"title": "Tower", "mapx": 126.988, "mapy": 37.551},
                {"title": "Market", "mapx": 126.999, "mapy": 37.570}
            ],
            "count": 3
        }));
        let set = p.markers(Intent::Recommend);
        assert_eq!(set.len(), 3);
        let ranks: Vec<_> = set.iter().map(|m| m.rank).collect();
        assert_eq!(ranks, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(set.first().unwrap().position, LatLng::new(37.579, 126.977));
        assert_eq!(p.count, Some(3));
    }

    #[test]
    fn test_items_without_coordinates_are_skipped_and_ranks_stay_dense() {
        let p = payload(json!({
            "pois": [
                {"title": "No coords"},
                {"title": "Zero", "mapx": 0, "mapy": 0},
                {"title": "Good", "mapx": 127.0, "mapy": 37.5}
            ]
        }));
        let set = p.markers(Intent::Landmark);
        assert_eq!(set.len(), 1);
        assert_eq!(set.first().unwrap().rank, Some(1));
        assert_eq!(set.first().unwrap().label.as_deref(), Some("Good"));
    }

    #[test]
    fn test_explicit_rank_wins() {
        let p = payload(json!({
            "places": [
                {"name": "B", "lat": 37.5, "lng": 127.0, "rank": 2},
                {"name": "A", "lat": 37.6, "lng": 127.1, "rank": 1}
            ]
        }));
        let ranks: Vec<_> = p.markers(Intent::FindPlace).iter().map(|m| m.rank).collect();
        assert_eq!(ranks, vec![Some(2), Some(1)]);
    }

    #[test]
    fn test_random_single_poi_is_unranked() {
        let p = payload(json!({
            "poi": {"title": "Surprise", "mapx": 127.0, "mapy": 37.5}
        }));
        let set = p.markers(Intent::Random);
        assert_eq!(set.len(), 1);
        assert_eq!(set.first().unwrap().rank, None);
    }

    #[test]
    fn test_route_endpoints() {
        let p = payload(json!({
            "routes": [{
                "info": {"totalTime": 32},
                "subPath": [
                    {"trafficType": 3, "distance": 200},
                    {"trafficType": 1, "startX": 127.027, "startY": 37.497, "startName": "Gangnam",
                     "endX": 126.977, "endY": 37.566, "endName": "City Hall"},
                    {"trafficType": 3, "distance": 150}
                ]
            }]
        }));
        let set = p.markers(Intent::Route);
        assert_eq!(set.len(), 2);
        let labels: Vec<_> = set.iter().map(|m| m.label.clone().unwrap()).collect();
        assert_eq!(labels, vec!["Gangnam", "City Hall"]);
    }

    #[test]
    fn test_route_without_sub_paths_is_empty() {
        let p = payload(json!({"routes": [{"info": {}}]}));
        assert!(p.markers(Intent::Route).is_empty());
        assert!(DataPayload::default().markers(Intent::Route).is_empty());
    }

    #[test]
    fn test_general_chat_never_has_markers() {
        let p = payload(json!({
            "places": [{"name": "Cafe", "lat": 37.5, "lng": 127.0}]
        }));
        assert!(p.markers(Intent::GeneralChat).is_empty());
    }

    #[test]
    fn test_missing_list_is_empty() {
        assert!(DataPayload::default().markers(Intent::Recommend).is_empty());
    }
}
