//! The canonical data model (spec.md §3), grounded on the original
//! `axiom/db/models/*.py` SQLAlchemy models. This is the single source of
//! truth for entity shapes; the HTTP/admin layer, migrations, and the
//! securities importer that also touch these tables are out of scope and
//! are treated as external collaborators of this module, not part of it.

pub mod chart;
pub mod enums;
pub mod level_one;
pub mod level_two;
pub mod oauth;
pub mod price;
pub mod security;
pub mod subscription;

pub use chart::ChartCandle;
pub use enums::{AssetSubType, AssetType, Book, OrderSide, SecurityStatus, StreamKind, StreamType, Timeframe};
pub use level_one::LevelOneSample;
pub use level_two::LevelTwoSample;
pub use oauth::{OAuthState, TokenBlob};
pub use price::Price;
pub use security::{Exchange, Security, SecurityIdRow};
pub use subscription::StreamSubscription;
