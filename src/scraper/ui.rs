//! Visible texts of the platform page that the interaction sequence relies on.
//! Both platform sections share one layout.

pub const BUTTON_ROLE: &str = "button";

pub const TICKER_PLACEHOLDER: &str = "Ticker";
pub const CONFIRM_BUTTON: &str = "Enter";
pub const DOWNLOAD_BUTTON: &str = "下載";

/// Opens the model dropdown (matched loosely).
pub const MODEL_PICKER: &str = "Select model";

/// Shown while a model is being computed.
pub const COMPUTING_TEXT: &str = "有些模型需要較長的時間計算";

/// Failure notifications, Chinese and English variants.
pub const FAILURE_TOASTS: [&str; 2] = ["獲取數據失敗", "Please Try Again"];

/// Present on every rendered TV Code line.
pub const CODE_MARKER: &str = "Put Wall";
