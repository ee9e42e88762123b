//! Controller layer for the pod details view.

pub mod actions;
pub mod compose;
pub mod events;
mod pod_details;

pub use pod_details::{
    Catalogs, NameEdit, PodDetailsController, PodDetailsServices, SectionArea, LOADING_TITLE,
};
