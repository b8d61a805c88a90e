pub mod bundle;
pub mod export;
pub mod init;
pub mod inspect;
pub mod verify;
