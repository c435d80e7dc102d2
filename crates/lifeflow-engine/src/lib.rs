pub mod bucket;
pub mod connections;
pub mod engine;
pub mod filter;
pub mod hit;
pub mod lanes;
pub mod nodes;
pub mod participants;
pub mod present;
pub mod scale;
pub mod settings;

pub use engine::{compute_layout, FlowEngine};
pub use hit::HitTester;
pub use participants::{ColorCache, ParticipantIndex};
pub use present::{FlowStyle, LayoutPresenter, SvgPresenter};
pub use settings::{ColorEviction, FlowSettings, JunctionPolicy};
