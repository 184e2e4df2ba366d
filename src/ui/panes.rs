/// The three selectable lists: the card grid and the two sidebars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Grid,
    Favorites,
    Emergency,
}

impl Panel {
    pub const COUNT: usize = 3;

    pub fn title(self) -> &'static str {
        match self {
            Panel::Grid => "CONTACTS",
            Panel::Favorites => "FAVORITES",
            Panel::Emergency => "EMERGENCY",
        }
    }

    pub fn digit(self) -> char {
        match self {
            Panel::Grid => '1',
            Panel::Favorites => '2',
            Panel::Emergency => '3',
        }
    }

    pub fn index(self) -> usize {
        match self {
            Panel::Grid => 0,
            Panel::Favorites => 1,
            Panel::Emergency => 2,
        }
    }

    pub fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '1' => Some(Panel::Grid),
            '2' => Some(Panel::Favorites),
            '3' => Some(Panel::Emergency),
            _ => None,
        }
    }

    /// Next panel, wrapping around.
    pub fn next(self) -> Self {
        match self {
            Panel::Grid => Panel::Favorites,
            Panel::Favorites => Panel::Emergency,
            Panel::Emergency => Panel::Grid,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Panel::Grid => Panel::Emergency,
            Panel::Favorites => Panel::Grid,
            Panel::Emergency => Panel::Favorites,
        }
    }
}
