// server/src/http/render.rs
//! Minimal server-side HTML rendering. Pages are deliberately spartan:
//! a shared shell with navigation for logged-in doctors, a flash banner,
//! and whatever body the handler builds.

use axum::response::Html;

use clinic::session::{Flash, FlashKind};

/// Escapes text for interpolation into HTML.
pub fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn flash_banner(flash: Option<&Flash>) -> String {
    match flash {
        Some(f) => {
            let class = match f.kind {
                FlashKind::Success => "flash success",
                FlashKind::Error => "flash error",
            };
            format!("<p class=\"{}\">{}</p>\n", class, esc(&f.text))
        }
        None => String::new(),
    }
}

const NAV: &str = "<nav>\
<a href=\"/dashboard\">Dashboard</a> | \
<a href=\"/patients\">Patients</a> | \
<a href=\"/appointments\">Appointments</a> | \
<a href=\"/prescriptions\">Prescriptions</a> | \
<a href=\"/lab-results\">Lab Results</a> | \
<a href=\"/medical-records\">Medical Records</a> | \
<a href=\"/billing\">Billing</a> | \
<a href=\"/profile\">Profile</a> | \
<a href=\"/logout\">Logout</a>\
</nav>\n";

/// Shell for pages behind the auth guard.
pub fn page(title: &str, doctor_name: &str, flash: Option<&Flash>, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\">\
         <title>{} - Clinic Management System</title></head>\n<body>\n\
         <header><h1>ClinicMS</h1><p>Dr. {}</p></header>\n{}{}{}\n</body>\n</html>\n",
        esc(title),
        esc(doctor_name),
        NAV,
        flash_banner(flash),
        body
    ))
}

/// Shell for the login/register pages.
pub fn public_page(title: &str, flash: Option<&Flash>, body: &str) -> Html<String> {
    let banner = flash_banner(flash);
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\">\
         <title>{} - Clinic Management System</title></head>\n<body>\n\
         <header><h1>ClinicMS</h1></header>\n{}{}\n</body>\n</html>\n",
        esc(title),
        banner,
        body
    ))
}

/// Renders an optional text field for display tables.
pub fn opt(value: &Option<String>) -> String {
    match value {
        Some(v) => esc(v),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html_metacharacters() {
        assert_eq!(esc("<script>\"&'"), "&lt;script&gt;&quot;&amp;&#39;");
        assert_eq!(esc("plain"), "plain");
    }

    #[test]
    fn page_includes_flash_once() {
        let flash = Flash::success("Saved.");
        let html = page("Test", "John Smith", Some(&flash), "<p>body</p>").0;
        assert!(html.contains("Saved."));
        assert!(html.contains("class=\"flash success\""));
        let html = page("Test", "John Smith", None, "<p>body</p>").0;
        assert!(!html.contains("flash success"));
    }
}
