//! Data models for the inventory backend.
//!
//! - `User` and the `/api/auth` request/response types
//! - Inventory resources loaded by views: `Item`, `Location`, `Tag`,
//!   `ItemType`, `UserAccount`

pub mod inventory;
pub mod user;

pub use inventory::{Item, ItemProperty, ItemType, ItemTypeRef, Location, LocationRef, PropertyValue, Tag, UserAccount};
pub use user::{AccountSummary, LoginResponse, ProfileUpdate, RegisterRequest, RegisteredUser, User};
