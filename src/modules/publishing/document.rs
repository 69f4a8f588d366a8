//! Article assembly.
//!
//! Articles are built as a sequence of [`Block`]s and only turned into HTML by
//! [`Document::to_html`], so the layouts can be inspected structurally. Layout
//! functions are pure; randomness (template choice for `random`, title choice)
//! comes from a caller-supplied [`Rng`].

use std::fmt;

use html_escape::{encode_double_quoted_attribute, encode_text};
use rand::{seq::SliceRandom, Rng};
use serde_json::json;

use super::models::{HotelRecord, Layout, TemplateVersion};

/// Gallery images shown after the hero image in the long layout.
const GALLERY_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    Image { src: String, alt: String },
    Button { href: String, label: String },
    List(Vec<String>),
    /// FAQPage structured data, rendered as a JSON-LD script.
    FaqSchema(Vec<FaqEntry>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    fn heading(&mut self, level: u8, text: impl Into<String>) {
        self.push(Block::Heading {
            level,
            text: text.into(),
        });
    }

    fn paragraph(&mut self, text: impl Into<String>) {
        self.push(Block::Paragraph(text.into()));
    }

    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Heading { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn to_html(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write_block(f, block)?;
        }
        Ok(())
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, block: &Block) -> fmt::Result {
    match block {
        Block::Heading { level, text } => {
            let level = (*level).clamp(1, 6);
            write!(f, "<h{level}>{}</h{level}>", encode_text(text))
        }
        Block::Paragraph(text) => write!(f, "<p>{}</p>", encode_text(text)),
        Block::Image { src, alt } => write!(
            f,
            r#"<figure class="wp-block-image"><img src="{}" alt="{}" loading="lazy"/></figure>"#,
            encode_double_quoted_attribute(src),
            encode_double_quoted_attribute(alt)
        ),
        Block::Button { href, label } => write!(
            f,
            r#"<div class="wp-block-buttons"><div class="wp-block-button"><a class="wp-block-button__link" href="{}" target="_blank" rel="nofollow sponsored noopener">{}</a></div></div>"#,
            encode_double_quoted_attribute(href),
            encode_text(label)
        ),
        Block::List(items) => {
            f.write_str("<ul>")?;
            for item in items {
                write!(f, "<li>{}</li>", encode_text(item))?;
            }
            f.write_str("</ul>")
        }
        Block::FaqSchema(entries) => {
            let schema = json!({
                "@context": "https://schema.org",
                "@type": "FAQPage",
                "mainEntity": entries.iter().map(|entry| json!({
                    "@type": "Question",
                    "name": entry.question,
                    "acceptedAnswer": { "@type": "Answer", "text": entry.answer },
                })).collect::<Vec<_>>(),
            });
            // A literal `<` could end the script element early.
            let payload = schema.to_string().replace('<', "\\u003c");
            write!(f, r#"<script type="application/ld+json">{payload}</script>"#)
        }
    }
}

/// Everything a layout needs to know.
#[derive(Debug, Clone, Copy)]
pub struct ArticleInput<'a> {
    pub keyword: &'a str,
    pub hotel: &'a HotelRecord,
    pub affiliate_link: &'a str,
}

impl TemplateVersion {
    /// Pick the concrete layout; only `Random` consults `rng`.
    pub fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> Layout {
        match self {
            TemplateVersion::Short => Layout::Short,
            TemplateVersion::Long => Layout::Long,
            TemplateVersion::Random => {
                if rng.gen_bool(0.5) {
                    Layout::Short
                } else {
                    Layout::Long
                }
            }
        }
    }
}

pub fn build_document(input: &ArticleInput<'_>, layout: Layout) -> Document {
    match layout {
        Layout::Short => short_layout(input),
        Layout::Long => long_layout(input),
    }
}

/// Choose a post title from the pattern pool.
pub fn compose_title<R: Rng + ?Sized>(keyword: &str, hotel: &HotelRecord, rng: &mut R) -> String {
    let name = &hotel.name;
    let mut patterns = vec![
        format!("{keyword}: {name} Review"),
        format!("{name}: Is It the Right Choice for {keyword}?"),
        format!("{keyword} | Everything to Know About {name}"),
        format!("Staying at {name}: A {keyword} Guide"),
    ];
    if let Some(city) = &hotel.city {
        patterns.push(format!("{keyword} in {city}: Why {name} Stands Out"));
    }

    patterns
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| keyword.to_string())
}

fn short_layout(input: &ArticleInput<'_>) -> Document {
    let hotel = input.hotel;
    let mut doc = Document::default();

    doc.heading(2, format!("{}: {}", input.keyword, hotel.name));
    doc.paragraph(intro(input));
    push_hero(&mut doc, hotel);

    let facts = quick_facts(hotel);
    if !facts.is_empty() {
        doc.paragraph(facts.join(" · "));
    }

    doc.push(Block::Button {
        href: input.affiliate_link.to_string(),
        label: format!("Check prices at {}", hotel.name),
    });
    doc
}

fn long_layout(input: &ArticleInput<'_>) -> Document {
    let hotel = input.hotel;
    let name = &hotel.name;
    let mut doc = Document::default();

    doc.paragraph(intro(input));
    push_hero(&mut doc, hotel);

    doc.heading(2, format!("Why choose {name}?"));
    doc.paragraph(why_choose(input));

    let highlights = highlights(hotel);
    if !highlights.is_empty() {
        doc.heading(2, format!("Highlights of {name}"));
        doc.push(Block::List(highlights));
    }

    if let Some(location) = hotel.location() {
        doc.heading(2, format!("Where is {name}?"));
        doc.paragraph(format!(
            "{name} is located in {location}, a convenient base for anyone searching for {}.",
            input.keyword
        ));
    }

    doc.heading(2, format!("Prices at {name}"));
    doc.paragraph(price_summary(hotel));
    doc.push(Block::Button {
        href: input.affiliate_link.to_string(),
        label: format!("See availability at {name}"),
    });

    let gallery: Vec<&String> = hotel.image_urls.iter().skip(1).take(GALLERY_SIZE).collect();
    if !gallery.is_empty() {
        doc.heading(2, format!("Photos of {name}"));
        for (i, src) in gallery.into_iter().enumerate() {
            doc.push(Block::Image {
                src: src.clone(),
                alt: format!("{name} photo {}", i + 2),
            });
        }
    }

    let faq = faq_entries(input);
    doc.heading(2, format!("Frequently asked questions about {name}"));
    for entry in &faq {
        doc.heading(3, entry.question.clone());
        doc.paragraph(entry.answer.clone());
    }
    doc.push(Block::FaqSchema(faq));

    doc.heading(2, "Final thoughts");
    doc.paragraph(format!(
        "If {} is what brought you here, {name} deserves a place on your shortlist. \
         Rates change daily, so check the current price before you decide.",
        input.keyword
    ));
    doc.push(Block::Button {
        href: input.affiliate_link.to_string(),
        label: format!("Book {name} now"),
    });
    doc
}

fn push_hero(doc: &mut Document, hotel: &HotelRecord) {
    if let Some(src) = hotel.image_urls.first() {
        doc.push(Block::Image {
            src: src.clone(),
            alt: hotel.name.clone(),
        });
    }
}

fn intro(input: &ArticleInput<'_>) -> String {
    let hotel = input.hotel;
    match hotel.location() {
        Some(location) => format!(
            "Looking for {}? {} in {location} is one of the options travellers keep coming back to. \
             Here is what you need to know before booking.",
            input.keyword, hotel.name
        ),
        None => format!(
            "Looking for {}? {} is one of the options travellers keep coming back to. \
             Here is what you need to know before booking.",
            input.keyword, hotel.name
        ),
    }
}

fn why_choose(input: &ArticleInput<'_>) -> String {
    let hotel = input.hotel;
    match (hotel.review_score, hotel.review_count) {
        (Some(score), Some(count)) => format!(
            "With a guest rating of {} from {count} reviews, {} has earned a solid reputation.",
            format_score(score),
            hotel.name
        ),
        (Some(score), None) => format!(
            "Guests rate {} {}, a sign of consistent service.",
            hotel.name,
            format_score(score)
        ),
        _ => format!(
            "{} combines a practical location with the comforts most travellers look for.",
            hotel.name
        ),
    }
}

fn quick_facts(hotel: &HotelRecord) -> Vec<String> {
    let mut facts = Vec::new();
    if let Some(stars) = hotel.star_rating {
        facts.push(format!("{} stars", format_decimal(stars)));
    }
    if let Some(score) = hotel.review_score {
        facts.push(format!("Guest rating {}", format_score(score)));
    }
    if let Some(rate) = hotel.daily_rate {
        facts.push(format!("From {} per night", format_price(rate, hotel.currency.as_deref())));
    }
    facts
}

fn highlights(hotel: &HotelRecord) -> Vec<String> {
    let mut items = quick_facts(hotel);
    if let Some(count) = hotel.review_count {
        items.push(format!("{count} verified guest reviews"));
    }
    match hotel.free_wifi {
        Some(true) => items.push("Free Wi-Fi".to_string()),
        Some(false) | None => {}
    }
    match hotel.include_breakfast {
        Some(true) => items.push("Breakfast included".to_string()),
        Some(false) | None => {}
    }
    items
}

fn price_summary(hotel: &HotelRecord) -> String {
    let currency = hotel.currency.as_deref();
    match (hotel.daily_rate, hotel.crossed_out_rate) {
        (Some(rate), Some(was)) if was > rate => format!(
            "Rooms currently start from {} per night, down from {}.",
            format_price(rate, currency),
            format_price(was, currency)
        ),
        (Some(rate), _) => format!(
            "Rooms currently start from {} per night.",
            format_price(rate, currency)
        ),
        (None, _) => "Prices depend on your travel dates; check live availability below.".to_string(),
    }
}

fn faq_entries(input: &ArticleInput<'_>) -> Vec<FaqEntry> {
    let hotel = input.hotel;
    let name = &hotel.name;
    let mut entries = Vec::new();

    if let Some(location) = hotel.location() {
        entries.push(FaqEntry {
            question: format!("Where is {name} located?"),
            answer: format!("{name} is located in {location}."),
        });
    }
    if let Some(score) = hotel.review_score {
        let answer = match hotel.review_count {
            Some(count) => format!("Guests rate {name} {} based on {count} reviews.", format_score(score)),
            None => format!("Guests rate {name} {}.", format_score(score)),
        };
        entries.push(FaqEntry {
            question: format!("What is the guest rating of {name}?"),
            answer,
        });
    }
    if let Some(rate) = hotel.daily_rate {
        entries.push(FaqEntry {
            question: format!("How much does a night at {name} cost?"),
            answer: format!(
                "Rates start from around {} per night, depending on dates and room type.",
                format_price(rate, hotel.currency.as_deref())
            ),
        });
    }
    if let Some(wifi) = hotel.free_wifi {
        entries.push(FaqEntry {
            question: format!("Does {name} offer free Wi-Fi?"),
            answer: if wifi {
                format!("Yes, {name} offers free Wi-Fi.")
            } else {
                format!("Free Wi-Fi is not listed for {name}; check the property details before booking.")
            },
        });
    }
    if let Some(breakfast) = hotel.include_breakfast {
        entries.push(FaqEntry {
            question: format!("Is breakfast included at {name}?"),
            answer: if breakfast {
                "Yes, the current rate includes breakfast.".to_string()
            } else {
                "Breakfast is not included in the current rate.".to_string()
            },
        });
    }
    entries.push(FaqEntry {
        question: format!("How do I book {name}?"),
        answer: format!("Use the booking button on this page to check availability and book {name} for your dates."),
    });

    entries
}

fn format_score(score: f64) -> String {
    format!("{}/10", format_decimal(score))
}

fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn format_price(amount: f64, currency: Option<&str>) -> String {
    let amount = if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    };
    match currency {
        Some(currency) => format!("{currency} {amount}"),
        None => amount,
    }
}
