//! Order execution: routing, confirmation, and bracket placement.
//!
//! The overlay produces [`TradeIntent`]s; the [`ActionDispatcher`]
//! gates them behind a single-slot confirmation; the [`OrderRouter`]
//! carries them to the broker. Bracket placement is its own state
//! machine because its draft outlives any single request.

pub mod bracket;
pub mod dispatcher;
pub mod error;
pub mod http_router;
pub mod intent;
pub mod router;

pub use bracket::{
    place_multi_order, BracketDraft, BracketPlacement, PlacementPhase, SubmitOutcome,
    BRACKET_TICK_OFFSET,
};
pub use dispatcher::{ActionDispatcher, ConfirmOutcome};
pub use error::{ExecError, ExecResult};
pub use http_router::HttpOrderRouter;
pub use intent::TradeIntent;
pub use router::{
    BoxFuture, BracketRequest, DynOrderRouter, MockOrderRouter, ModifyRequest, OrderRequest,
    OrderRouter, RouterCall,
};
