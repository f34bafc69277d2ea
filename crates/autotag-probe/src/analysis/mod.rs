pub mod mel;
