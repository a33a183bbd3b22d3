pub mod auth;
pub mod beneficiaries;
pub mod disbursements;
pub mod donations;
pub mod groups;
pub mod payers;
pub mod rates;
pub mod reports;
pub mod subdivisions;
pub mod users;
