//! SeaORM entities for the ledger tables.
//!
//! Payers, their names and donations hang off an RT; disbursements hang off
//! a beneficiary. Enums stored as text columns live next to the table that
//! owns them, except [`ZakatKind`] which several tables share.

pub mod beneficiary;
pub mod disbursement;
pub mod donation;
pub mod group;
pub mod payer;
pub mod payer_name;
pub mod session;
pub mod subdivision;
pub mod user;
pub mod zakat_kind;
pub mod zakat_rate;

// Re-export specific types to avoid conflicts
pub use beneficiary::{
    Column as BeneficiaryColumn, Entity as Beneficiary, Model as BeneficiaryModel,
};
pub use disbursement::{
    Column as DisbursementColumn, DisbursementStatus, Entity as Disbursement,
    Model as DisbursementModel,
};
pub use donation::{
    Column as DonationColumn, DonationSource, Entity as Donation, Model as DonationModel,
};
pub use group::{Column as GroupColumn, Entity as Group, Model as GroupModel};
pub use payer::{Column as PayerColumn, Entity as Payer, Model as PayerModel};
pub use payer_name::{Column as PayerNameColumn, Entity as PayerName, Model as PayerNameModel};
pub use session::{Column as SessionColumn, Entity as Session, Model as SessionModel};
pub use subdivision::{
    Column as SubdivisionColumn, Entity as Subdivision, Model as SubdivisionModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, Role};
pub use zakat_kind::ZakatKind;
pub use zakat_rate::{Column as ZakatRateColumn, Entity as ZakatRate, Model as ZakatRateModel};
