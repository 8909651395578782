use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub text: &'static str,
    pub author: &'static str,
}

pub const QUOTES: [Quote; 5] = [
    Quote {
        text: "The best way to predict the future is to create it.",
        author: "Peter Drucker",
    },
    Quote {
        text: "Success is not the key to happiness. Happiness is the key to success.",
        author: "Albert Schweitzer",
    },
    Quote {
        text: "Don\u{2019}t watch the clock; do what it does. Keep going.",
        author: "Sam Levenson",
    },
    Quote {
        text: "The secret of getting ahead is getting started.",
        author: "Mark Twain",
    },
    Quote {
        text: "Believe you can and you\u{2019}re halfway there.",
        author: "Theodore Roosevelt",
    },
];

/// Same quote all day, rotating through the list day by day.
pub fn quote_of_the_day(day: NaiveDate) -> &'static Quote {
    let idx = day.num_days_from_ce().rem_euclid(QUOTES.len() as i32) as usize;
    &QUOTES[idx]
}
