//! Built-in analysis stages for test-execution logs.
//!
//! Every stage here is registered by [`builtin_registry`] under the handle
//! `log_stages::<module>.<Type>`, which is how pipeline configurations refer
//! to them:
//!
//! ```yaml
//! tag_components:
//!   module: log_stages::components
//!   class: TagComponentIds
//! extract_components:
//!   module: log_stages::components
//!   class: ExtractComponentIds
//!   depends_on: tag_components
//! ```

pub mod classify;
pub mod components;
pub mod connections;
pub mod emit;
pub mod message_type;
pub mod msg_id;
pub mod sdata;

pub use classify::{ClassifyRecord, RecordClass};
pub use components::{ExtractComponentIds, TagComponentIds};
pub use connections::IdentifyConnectionsByPort;
pub use emit::EmitJsonLines;
pub use message_type::IdentifyMessageType;
pub use msg_id::IdentifyMessage;
pub use sdata::{ParseSdata, SegregateSdata};

use testlog_pipelines::StageRegistry;

/// A registry holding every stage in this crate.
pub fn builtin_registry() -> StageRegistry {
    let mut registry = StageRegistry::new();
    registry
        .register_default::<ClassifyRecord>("log_stages::classify", "ClassifyRecord")
        .register_default::<TagComponentIds>("log_stages::components", "TagComponentIds")
        .register_default::<ExtractComponentIds>("log_stages::components", "ExtractComponentIds")
        .register_default::<IdentifyConnectionsByPort>(
            "log_stages::connections",
            "IdentifyConnectionsByPort",
        )
        .register_default::<EmitJsonLines>("log_stages::emit", "EmitJsonLines")
        .register_default::<IdentifyMessageType>("log_stages::message_type", "IdentifyMessageType")
        .register_default::<IdentifyMessage>("log_stages::msg_id", "IdentifyMessage")
        .register_default::<SegregateSdata>("log_stages::sdata", "SegregateSdata")
        .register_default::<ParseSdata>("log_stages::sdata", "ParseSdata");
    registry
}
