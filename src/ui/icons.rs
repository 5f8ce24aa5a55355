pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const DATABASE: &str = "🗄️";
    pub const TABLE: &str = "📋";
    pub const PERSON: &str = "👤";
    pub const LOCK: &str = "🔒";
    pub const KEY: &str = "🔑";
    pub const DEL: &str = "🗑️";
    pub const EXPORT: &str = "📤";
    pub const NEW: &str = "✨";
}
