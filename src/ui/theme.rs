use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub dim: Style,
    /// Type names and import paths
    pub ident: Style,
    pub user: Style,
    pub vendored: Style,
    pub system: Style,
}

impl Theme {
    pub fn detect() -> Self {
        Self::select(console::Term::stdout().is_term(), std::env::var_os("NO_COLOR").is_some())
    }

    pub fn select(is_term: bool, no_color: bool) -> Self {
        if !is_term || no_color {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            dim: Style::new().white().dimmed(),
            ident: Style::new().bold(),
            user: Style::new().green(),
            vendored: Style::new().magenta(),
            system: Style::new().blue(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warn: Style::new(),
            dim: Style::new(),
            ident: Style::new(),
            user: Style::new(),
            vendored: Style::new(),
            system: Style::new(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
