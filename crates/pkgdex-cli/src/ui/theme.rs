//! Colors and icons shared by every command.

use crossterm::style::Color;

#[derive(Debug, Clone, Copy)]
pub struct Colors {
    pub package_name: Color,
    pub version: Color,
    pub secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub header: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct Icons {
    pub success: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
    pub info: &'static str,
    pub skipped: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub colors: Colors,
    pub icons: Icons,
    /// Width of the package identifier column in list output.
    pub id_width: usize,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            colors: Colors {
                package_name: Color::White,
                version: Color::Cyan,
                secondary: Color::DarkGrey,
                success: Color::Green,
                warning: Color::Yellow,
                error: Color::Red,
                header: Color::Blue,
            },
            icons: Icons {
                success: "+",
                warning: "!",
                error: "x",
                info: "i",
                skipped: "-",
            },
            id_width: 36,
        }
    }
}
