// ABOUTME: Agent runtime for crewline: completion and tool gateway clients, role agents, and crews.
// ABOUTME: Exposes the conversational agent and the sequential workflow executor built on them.

pub mod completion;
pub mod conversational;
pub mod crew;
pub mod gateway;
pub mod protocol;
pub mod role;
pub mod testing;

pub use completion::{CompletionClient, CompletionError, HttpCompletionClient, ModelStatus, complete_inline};
pub use conversational::ConversationalAgent;
pub use crew::{Crew, resolve_tool_call};
pub use gateway::{HttpToolGateway, NoToolGateway, ToolDescriptor, ToolGateway};
pub use protocol::{ToolDirective, classify};
pub use role::RoleAgent;
