use std::fmt;

use tokio::sync::mpsc::UnboundedSender;

use beaty_core::types::MarkerSet;

use crate::camera::CameraCoordinator;
use crate::input::Input;
use crate::observer::SessionObserver;
use crate::scheduler::Scheduler;

/// The shared UI collaborators of the response bubble and map.
///
/// Exactly one owner at a time: the coordinator while idle, otherwise the
/// orchestrator of the current session, which hands it back on supersession.
pub struct Surface {
    pub(crate) camera: Box<dyn CameraCoordinator>,
    pub(crate) observer: Box<dyn SessionObserver>,
    pub(crate) scheduler: Box<dyn Scheduler>,
    pub(crate) inbox: UnboundedSender<Input>,
    markers: MarkerSet,
}

impl Surface {
    pub fn new(
        camera: impl CameraCoordinator + 'static,
        observer: impl SessionObserver + 'static,
        scheduler: impl Scheduler + 'static,
        inbox: UnboundedSender<Input>,
    ) -> Self {
        Self {
            camera: Box::new(camera),
            observer: Box::new(observer),
            scheduler: Box::new(scheduler),
            inbox,
            markers: MarkerSet::empty(),
        }
    }

    /// Markers currently on the map.
    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    /// Swap the active marker set in one step; the old and new sets are never
    /// on the map together.
    pub(crate) fn replace_markers(&mut self, markers: MarkerSet) {
        self.camera.clear_markers();
        if !markers.is_empty() {
            self.camera.place_markers(&markers);
        }
        self.markers = markers;
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("markers", &self.markers.len())
            .finish_non_exhaustive()
    }
}
