use crate::source::PackageKind;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::PACKAGE, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

/// Provenance tag coloured by kind
pub fn kind_label(kind: PackageKind) -> String {
    let style = match kind {
        PackageKind::User => theme().user.clone(),
        PackageKind::Vendored => theme().vendored.clone(),
        PackageKind::System => theme().system.clone(),
        PackageKind::None => theme().dim.clone(),
    };
    format!("[{}]", kind).style(style).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_label() {
        assert!(kind_label(PackageKind::Vendored).contains("[vendor]"));
        assert!(kind_label(PackageKind::System).contains("[system]"));
    }
}
