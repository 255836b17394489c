pub mod constants;
pub mod template;
pub mod types;

#[cfg(test)]
pub mod test_helpers;
