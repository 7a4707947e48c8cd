pub mod code_hash;
pub mod input_validation;
