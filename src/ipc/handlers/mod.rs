pub mod admin;
pub mod assets;
pub mod backup_exchange;
pub mod catalog;
pub mod chat;
pub mod core;
pub mod courses;
pub mod promos;
pub mod purchase;
pub mod session;
pub mod timetable;
pub mod tutoring;
pub mod users;
