use crate::types::MarkerId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("region `{0}` is defined more than once")]
    DuplicateRegion(String),

    #[error("point of interest `{marker}` refers to unknown region `{region}`")]
    OrphanedPoi { marker: MarkerId, region: String },

    #[error("marker id `{0}` is used by more than one point of interest")]
    DuplicateMarker(MarkerId),

    #[error("point of interest `{marker}` has an invalid position ({lat}, {lon})")]
    InvalidPosition { marker: MarkerId, lat: f64, lon: f64 },
}
