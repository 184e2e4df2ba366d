//! Pure projection from the contact collection to what a front end shows.

use crate::config::RgbColor;
use crate::contact::Contact;
use crate::search;

pub const GRID_EMPTY_MESSAGE: &str = "No contacts found";
pub const FAVORITES_EMPTY_MESSAGE: &str = "No favorites yet";
pub const EMERGENCY_EMPTY_MESSAGE: &str = "No emergency contacts";

/// One avatar background, as the two stops of a 135deg linear gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gradient {
    pub from: RgbColor,
    pub to: RgbColor,
}

pub static PALETTE: [Gradient; 8] = [
    Gradient {
        // #667eea -> #764ba2
        from: RgbColor::new(0x66, 0x7e, 0xea),
        to: RgbColor::new(0x76, 0x4b, 0xa2),
    },
    Gradient {
        // #f093fb -> #f5576c
        from: RgbColor::new(0xf0, 0x93, 0xfb),
        to: RgbColor::new(0xf5, 0x57, 0x6c),
    },
    Gradient {
        // #4facfe -> #00f2fe
        from: RgbColor::new(0x4f, 0xac, 0xfe),
        to: RgbColor::new(0x00, 0xf2, 0xfe),
    },
    Gradient {
        // #43e97b -> #38f9d7
        from: RgbColor::new(0x43, 0xe9, 0x7b),
        to: RgbColor::new(0x38, 0xf9, 0xd7),
    },
    Gradient {
        // #fa709a -> #fee140
        from: RgbColor::new(0xfa, 0x70, 0x9a),
        to: RgbColor::new(0xfe, 0xe1, 0x40),
    },
    Gradient {
        // #30cfd0 -> #330867
        from: RgbColor::new(0x30, 0xcf, 0xd0),
        to: RgbColor::new(0x33, 0x08, 0x67),
    },
    Gradient {
        // #a8edea -> #fed6e3
        from: RgbColor::new(0xa8, 0xed, 0xea),
        to: RgbColor::new(0xfe, 0xd6, 0xe3),
    },
    Gradient {
        // #ff9a9e -> #fecfef
        from: RgbColor::new(0xff, 0x9a, 0x9e),
        to: RgbColor::new(0xfe, 0xcf, 0xef),
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    pub initial: String,
    pub palette_index: usize,
}

impl Avatar {
    /// Uppercased first letter, colored by its code point modulo the palette
    /// size. Names sharing that residue share a color.
    pub fn for_name(name: &str) -> Self {
        let Some(first) = name.chars().next() else {
            return Self {
                initial: "?".to_string(),
                palette_index: 0,
            };
        };
        let initial: String = first.to_uppercase().collect();
        let code = initial.chars().next().map_or(0, u32::from) as usize;
        Self {
            initial,
            palette_index: code % PALETTE.len(),
        }
    }

    pub fn gradient(&self) -> &'static Gradient {
        &PALETTE[self.palette_index]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    Call,
    Email,
    Favorite,
    Emergency,
    Edit,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub id: String,
    pub avatar: Avatar,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub group: Option<String>,
    pub notes: Option<String>,
    pub is_favorite: bool,
    pub is_emergency: bool,
}

impl CardView {
    pub fn from_contact(contact: &Contact) -> Self {
        Self {
            id: contact.id.clone(),
            avatar: Avatar::for_name(&contact.name),
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            email: contact.email.clone(),
            address: contact.address.clone(),
            group: contact.group.clone(),
            notes: contact.notes.clone(),
            is_favorite: contact.is_favorite,
            is_emergency: contact.is_emergency,
        }
    }

    /// Details section is shown only when there is an email or address.
    pub fn has_details(&self) -> bool {
        self.email.is_some() || self.address.is_some()
    }

    /// Tags section is shown only when there is a group or notes.
    pub fn has_tags(&self) -> bool {
        self.group.is_some() || self.notes.is_some()
    }

    pub fn affordances(&self) -> Vec<Affordance> {
        let mut out = vec![Affordance::Call];
        if self.email.is_some() {
            out.push(Affordance::Email);
        }
        out.extend([
            Affordance::Favorite,
            Affordance::Emergency,
            Affordance::Edit,
            Affordance::Delete,
        ]);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarItem {
    pub id: String,
    pub avatar: Avatar,
    pub name: String,
    pub phone: String,
}

impl SidebarItem {
    pub fn from_contact(contact: &Contact) -> Self {
        Self {
            id: contact.id.clone(),
            avatar: Avatar::for_name(&contact.name),
            name: contact.name.clone(),
            phone: contact.phone.clone(),
        }
    }
}

/// A rendered collection, or the placeholder shown instead of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing<T> {
    Empty { message: &'static str },
    Items(Vec<T>),
}

impl<T> Listing<T> {
    fn from_items(items: Vec<T>, message: &'static str) -> Self {
        if items.is_empty() {
            Listing::Empty { message }
        } else {
            Listing::Items(items)
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            Listing::Empty { .. } => &[],
            Listing::Items(items) => items,
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        match self {
            Listing::Empty { message } => Some(*message),
            Listing::Items(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub favorites: usize,
    pub emergency: usize,
}

impl Stats {
    pub fn of(contacts: &[Contact]) -> Self {
        Self {
            total: contacts.len(),
            favorites: contacts.iter().filter(|c| c.is_favorite).count(),
            emergency: contacts.iter().filter(|c| c.is_emergency).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub grid: Listing<CardView>,
    pub favorites: Listing<SidebarItem>,
    pub emergency: Listing<SidebarItem>,
    pub stats: Stats,
}

/// Project the collection for display.
///
/// `filter` narrows only the grid. Sidebars and stats always reflect the
/// whole collection.
pub fn project(contacts: &[Contact], filter: Option<&str>) -> ViewModel {
    let cards = search::filter(contacts, filter.unwrap_or(""))
        .into_iter()
        .map(CardView::from_contact)
        .collect();

    let favorites = contacts
        .iter()
        .filter(|c| c.is_favorite)
        .map(SidebarItem::from_contact)
        .collect();

    let emergency = contacts
        .iter()
        .filter(|c| c.is_emergency)
        .map(SidebarItem::from_contact)
        .collect();

    ViewModel {
        grid: Listing::from_items(cards, GRID_EMPTY_MESSAGE),
        favorites: Listing::from_items(favorites, FAVORITES_EMPTY_MESSAGE),
        emergency: Listing::from_items(emergency, EMERGENCY_EMPTY_MESSAGE),
        stats: Stats::of(contacts),
    }
}
