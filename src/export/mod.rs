//! Pipeline persistence

mod serializer;

pub use serializer::{load_pipeline, save_pipeline, ModelMetadata, SerializationFormat};
