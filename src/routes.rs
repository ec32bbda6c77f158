// Route path constants - single source of truth for all API paths

pub const HEALTH: &str = "/health";
pub const SUBMIT: &str = "/api/additem";
pub const APPROVE: &str = "/api/approve/{orderId}";
pub const PENDING: &str = "/api/pending";
pub const APPROVED: &str = "/api/approved";
pub const APPROVED_PICKUP: &str = "/api/approvedpickup";
pub const ORDER: &str = "/api/list/{orderId}";
pub const UPLOAD: &str = "/api/upload";
pub const SWAGGER_UI: &str = "/swagger-ui";
pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";
