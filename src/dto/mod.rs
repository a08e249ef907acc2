/// URL-encoded forms and query strings.
pub mod forms;
/// Askama view models.
pub mod pages;
/// Multipart upload parsing.
pub mod upload;
/// Custom field validators.
pub mod validation;
