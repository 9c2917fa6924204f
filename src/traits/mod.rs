pub mod element;

pub use element::{Element, ElementInit, ElementResponse, GeneratorResponse, StreamEvent, Swag};
