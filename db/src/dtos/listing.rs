/// Normalized search filters. Every `Some`/non-empty field narrows the result
/// set; pagination values are already clamped by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    pub query: Option<String>,
    pub category: Option<String>,
    pub state: Option<String>,
    pub remote_only: bool,
    pub cause_areas: Vec<String>,
    pub subcategory: Option<String>,
    pub limit: i64,
    pub offset: i64,
}
