pub mod read_elements;
