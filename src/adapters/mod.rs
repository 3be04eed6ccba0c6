//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                     |
//! |----------------|--------------------|---------------------------------|
//! | `simulated`    | HardwareBridge     | Software plant + PID            |
//! | `bridge`       | HardwareBridge     | Simulated or external variant   |
//! | `log_sink`     | EventSink          | `log` facade                    |
//! | `csv_log`      | EventSink          | Append-only CSV file            |
//! | `history`      | EventSink          | In-memory ring of 600 samples   |
//! | `config_file`  | ConfigPort         | JSON file                       |
//! | `storage`      | StoragePort        | State directory / in-memory map |
//! | `clock`        | ClockPort          | `Instant` / simulated time      |

pub mod bridge;
pub mod clock;
pub mod config_file;
pub mod csv_log;
pub mod history;
pub mod log_sink;
pub mod simulated;
pub mod storage;
