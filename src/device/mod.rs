pub mod events;
pub mod session;
pub mod source;
pub mod ticker;
pub mod types;

pub use events::{EventBus, SessionEvent};
pub use session::{DeviceSession, SessionSnapshot};
pub use source::{DeviceSource, MockDeviceSource};
pub use ticker::Ticker;
pub use types::{now_millis, ConnectionRecord, ConnectionStatus, Folder, Recording};
