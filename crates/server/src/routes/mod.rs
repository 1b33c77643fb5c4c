pub mod cards;
pub mod checklists;
pub mod health;
pub mod lists;
pub mod projects;
pub mod rooms;
