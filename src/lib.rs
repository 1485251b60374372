pub mod activate;
pub mod backup;
pub mod commands;
pub mod doctor;
pub mod error;
pub mod fs_utils;
pub mod hooks;
pub mod paths;
pub mod profiles;
pub mod restore;
pub mod ui;

#[cfg(test)]
pub mod test_utils;
