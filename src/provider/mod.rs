pub mod capability;
pub mod global;
pub mod json_rpc;
pub mod listeners;
pub mod mock;
pub mod traits;

pub use capability::{detect, detect_injected, ProviderCapability};
pub use json_rpc::JsonRpcProvider;
pub use mock::MockProvider;
pub use traits::{
    methods, ConnectInfo, Eip1193Provider, EventHandler, ListenerId, ProviderEvent,
    ProviderEventKind, ProviderRpcError, RpcRequest,
};
