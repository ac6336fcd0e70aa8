pub mod topic_dto;
pub mod device_dto;
pub mod decoded_dto;
pub mod command_dto;
