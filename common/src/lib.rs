// Ledger emulator common library - main library exports

pub mod address;
pub mod asset;
pub mod calculations;
pub mod cbor;
pub mod certificate;
pub mod configuration;
pub mod crypto;
pub mod drep;
pub mod governance;
pub mod hash;
pub mod protocol_params;
pub mod rational_number;
pub mod script;
pub mod tx;
pub mod types;
pub mod validation;

// Flattened re-exports
pub use self::address::*;
pub use self::asset::*;
pub use self::certificate::*;
pub use self::drep::*;
pub use self::governance::*;
pub use self::hash::*;
pub use self::script::*;
pub use self::tx::*;
pub use self::types::*;
