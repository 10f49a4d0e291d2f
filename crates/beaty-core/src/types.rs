use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Geography
// =============================================================================

/// A WGS84 coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and not the `(0, 0)` "no location"
    /// sentinel that upstream services emit for missing coordinates.
    pub fn is_usable(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && !(self.lat == 0.0 && self.lng == 0.0)
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Axis-aligned box spanning a set of coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl Bounds {
    /// Smallest box enclosing every point. `None` for an empty iterator.
    pub fn enclosing<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a LatLng>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Bounds {
            south_west: *first,
            north_east: *first,
        };
        for p in iter {
            bounds.south_west.lat = bounds.south_west.lat.min(p.lat);
            bounds.south_west.lng = bounds.south_west.lng.min(p.lng);
            bounds.north_east.lat = bounds.north_east.lat.max(p.lat);
            bounds.north_east.lng = bounds.north_east.lng.max(p.lng);
        }
        Some(bounds)
    }

    pub fn contains(&self, p: &LatLng) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&p.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&p.lng)
    }
}

// =============================================================================
// Markers
// =============================================================================

/// A single map marker produced from a `data` frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub position: LatLng,
    /// 1-based display rank, if the result list is ordered.
    pub rank: Option<u32>,
    pub label: Option<String>,
}

/// Where the camera should go to show a marker set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraRegion {
    /// Fit a box around several markers.
    Fit(Bounds),
    /// Center on a single point at a fixed zoom.
    Point(LatLng),
}

/// Ordered list of markers. Replaced as a whole, never edited in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerSet(Vec<Marker>);

impl MarkerSet {
    pub fn new(markers: Vec<Marker>) -> Self {
        Self(markers)
    }

    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Marker> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&Marker> {
        self.0.first()
    }

    /// Bounding box when there is more than one marker, otherwise the single
    /// marker's position.
    pub fn region(&self) -> Option<CameraRegion> {
        match self.0.len() {
            0 => None,
            1 => Some(CameraRegion::Point(self.0[0].position)),
            _ => Bounds::enclosing(self.0.iter().map(|m| &m.position)).map(CameraRegion::Fit),
        }
    }
}

impl<'a> IntoIterator for &'a MarkerSet {
    type Item = &'a Marker;
    type IntoIter = std::slice::Iter<'a, Marker>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Server-side response mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Final response only.
    #[default]
    Real,
    /// Final response plus the pipeline steps (diagnostics).
    Test,
}

/// A submitted query. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    pub location: Option<LatLng>,
    #[serde(default)]
    pub mode: QueryMode,
}

impl QueryRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: None,
            mode: QueryMode::Real,
        }
    }

    pub fn with_location(mut self, location: LatLng) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_mode(mut self, mode: QueryMode) -> Self {
        self.mode = mode;
        self
    }
}

/// What the server decided the query was about.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    FindPlace,
    Recommend,
    Landmark,
    Random,
    Route,
    #[default]
    GeneralChat,
}

impl Intent {
    /// Parse the wire name. Unknown names fall back to `GeneralChat`.
    pub fn from_wire(name: &str) -> Self {
        match name {
            "FIND_PLACE" => Intent::FindPlace,
            "RECOMMEND" => Intent::Recommend,
            "LANDMARK" => Intent::Landmark,
            "RANDOM" => Intent::Random,
            "ROUTE" => Intent::Route,
            _ => Intent::GeneralChat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::FindPlace => "FIND_PLACE",
            Intent::Recommend => "RECOMMEND",
            Intent::Landmark => "LANDMARK",
            Intent::Random => "RANDOM",
            Intent::Route => "ROUTE",
            Intent::GeneralChat => "GENERAL_CHAT",
        }
    }

    /// Intents whose response is meaningless without at least one marker.
    pub fn requires_markers(&self) -> bool {
        matches!(
            self,
            Intent::FindPlace | Intent::Recommend | Intent::Landmark | Intent::Random
        )
    }

    /// Intents whose text reveal waits for the camera to settle.
    pub fn gates_reveal_on_camera(&self) -> bool {
        matches!(self, Intent::Recommend)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sessions
// =============================================================================

/// Monotonically increasing session identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        SessionId(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle phase of a response session.
///
/// `Requesting -> (AwaitingCameraSettle)? -> Revealing -> Complete | Errored | Superseded`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Query sent, nothing shown yet beyond the placeholder.
    Requesting,
    /// Markers placed, waiting for the camera animation to finish.
    AwaitingCameraSettle,
    /// Response text is being revealed.
    Revealing,
    Complete,
    Errored,
    /// Replaced by a newer submission.
    Superseded,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionPhase::Complete | SessionPhase::Errored | SessionPhase::Superseded
        )
    }

    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SessionPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        if target.is_terminal() {
            return true;
        }
        matches!(
            (self, target),
            (SessionPhase::Requesting, SessionPhase::AwaitingCameraSettle)
                | (SessionPhase::Requesting, SessionPhase::Revealing)
                | (SessionPhase::AwaitingCameraSettle, SessionPhase::Revealing)
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Requesting => "Requesting",
            SessionPhase::AwaitingCameraSettle => "AwaitingCameraSettle",
            SessionPhase::Revealing => "Revealing",
            SessionPhase::Complete => "Complete",
            SessionPhase::Errored => "Errored",
            SessionPhase::Superseded => "Superseded",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(lat: f64, lng: f64) -> Marker {
        Marker {
            position: LatLng::new(lat, lng),
            rank: None,
            label: None,
        }
    }

    #[test]
    fn test_bounds_enclose_all_points() {
        let points = vec![
            LatLng::new(37.50, 127.02),
            LatLng::new(37.57, 126.97),
            LatLng::new(37.55, 127.10),
        ];
        let bounds = Bounds::enclosing(&points).unwrap();
        assert_eq!(bounds.south_west, LatLng::new(37.50, 126.97));
        assert_eq!(bounds.north_east, LatLng::new(37.57, 127.10));
        assert!(points.iter().all(|p| bounds.contains(p)));
    }

    #[test]
    fn test_bounds_empty() {
        let points: Vec<LatLng> = vec![];
        assert!(Bounds::enclosing(&points).is_none());
    }

    #[test]
    fn test_region_single_marker_is_point() {
        let set = MarkerSet::new(vec![marker(37.5, 127.0)]);
        assert_eq!(
            set.region(),
            Some(CameraRegion::Point(LatLng::new(37.5, 127.0)))
        );
    }

    #[test]
    fn test_region_many_markers_is_fit() {
        let set = MarkerSet::new(vec![marker(37.5, 127.0), marker(37.6, 127.1)]);
        match set.region() {
            Some(CameraRegion::Fit(b)) => {
                assert_eq!(b.south_west, LatLng::new(37.5, 127.0));
                assert_eq!(b.north_east, LatLng::new(37.6, 127.1));
            }
            other => panic!("expected Fit, got {:?}", other),
        }
    }

    #[test]
    fn test_region_empty_is_none() {
        assert!(MarkerSet::empty().region().is_none());
    }

    #[test]
    fn test_latlng_usable() {
        assert!(LatLng::new(37.5, 127.0).is_usable());
        assert!(!LatLng::new(0.0, 0.0).is_usable());
        assert!(!LatLng::new(f64::NAN, 127.0).is_usable());
        assert!(!LatLng::new(127.0, 37.5).is_usable());
    }

    #[test]
    fn test_intent_wire_names() {
        for intent in [
            Intent::FindPlace,
            Intent::Recommend,
            Intent::Landmark,
            Intent::Random,
            Intent::Route,
            Intent::GeneralChat,
        ] {
            assert_eq!(Intent::from_wire(intent.as_str()), intent);
            let json = serde_json::to_string(&intent).unwrap();
            assert_eq!(json, format!("\"{}\"", intent.as_str()));
        }
        assert_eq!(Intent::from_wire("WEATHER"), Intent::GeneralChat);
    }

    #[test]
    fn test_intent_marker_requirements() {
        assert!(Intent::Recommend.requires_markers());
        assert!(Intent::FindPlace.requires_markers());
        assert!(!Intent::Route.requires_markers());
        assert!(!Intent::GeneralChat.requires_markers());
        assert!(Intent::Recommend.gates_reveal_on_camera());
        assert!(!Intent::FindPlace.gates_reveal_on_camera());
    }

    #[test]
    fn test_session_id_monotonic() {
        let id = SessionId(7);
        assert!(id.next() > id);
        assert_eq!(id.next().to_string(), "#8");
    }

    #[test]
    fn test_phase_transitions() {
        use SessionPhase::*;
        assert!(Requesting.can_transition_to(&Revealing));
        assert!(Requesting.can_transition_to(&AwaitingCameraSettle));
        assert!(AwaitingCameraSettle.can_transition_to(&Revealing));
        assert!(AwaitingCameraSettle.can_transition_to(&Complete));
        assert!(Revealing.can_transition_to(&Errored));
        assert!(Requesting.can_transition_to(&Superseded));

        assert!(!Revealing.can_transition_to(&Requesting));
        assert!(!Revealing.can_transition_to(&AwaitingCameraSettle));
        assert!(!Complete.can_transition_to(&Revealing));
        assert!(!Complete.can_transition_to(&Superseded));
        assert!(!Errored.can_transition_to(&Complete));
    }

    #[test]
    fn test_phase_terminal() {
        assert!(SessionPhase::Complete.is_terminal());
        assert!(SessionPhase::Errored.is_terminal());
        assert!(SessionPhase::Superseded.is_terminal());
        assert!(!SessionPhase::Requesting.is_terminal());
        assert!(!SessionPhase::AwaitingCameraSettle.is_terminal());
        assert!(!SessionPhase::Revealing.is_terminal());
    }

    #[test]
    fn test_query_request_builder() {
        let req = QueryRequest::new("find cafes")
            .with_location(LatLng::new(37.49, 127.02))
            .with_mode(QueryMode::Test);
        assert_eq!(req.text, "find cafes");
        assert_eq!(req.location, Some(LatLng::new(37.49, 127.02)));
        assert_eq!(req.mode, QueryMode::Test);
    }
}
