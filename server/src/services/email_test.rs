use super::*;

#[test]
fn render_template_injects_all_placeholders() {
    let html = render_verification_email("Trinity", "trinity@gmail.com", "482913", 15).unwrap();
    assert!(html.contains("Trinity"));
    assert!(html.contains("trinity@gmail.com"));
    assert!(html.contains("482913"));
    assert!(html.contains("15 minutes"));
    assert!(!html.contains("{{"));
}

#[test]
fn render_template_escapes_user_fields() {
    let name = r#"<a href="https://evil.example">Reset here</a>"#;
    let html = render_verification_email(name, "o'neil&co@gmail.com", "482913", 15).unwrap();
    assert!(!html.contains("<a href"));
    assert!(!html.contains("evil.example\""));
    assert!(html.contains("&lt;a href="));
    assert!(html.contains("&lt;/a&gt;"));
    assert!(!html.contains("o'neil&co"));
    assert!(html.contains("&amp;co@gmail.com"));
}

#[tokio::test]
async fn missing_provider_falls_back_to_log() {
    let result = deliver_verification_code(None, "Neo", "neo@gmail.com", "123456", 15).await;
    assert!(result.is_ok());
}
