pub mod check_in_dto;
pub mod circumvention_dto;
pub mod settings_dto;
