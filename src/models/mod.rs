pub mod check_in;
pub mod circumvention_flag;
pub mod introduction;
pub mod parsed_response;
pub mod placement;
pub mod settings;
