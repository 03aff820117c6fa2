//! quizforge-report: HTML and Markdown statistics reports.

pub mod html;
pub mod markdown;

pub use html::{generate_html, write_html_report};
pub use markdown::{generate_admin_markdown, generate_markdown};
