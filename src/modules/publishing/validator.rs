//! Turns a raw [`PublishRequest`] into a [`ResolvedRequest`], or reports every
//! problem with it at once.

use hotelpress_http::AppError;
use hotelpress_kernel::Settings;
use serde_json::json;
use thiserror::Error;
use time::{
    format_description::{well_known::Rfc3339, BorrowedFormatItem},
    macros::format_description,
    Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset,
};
use url::Url;

use super::models::{
    HotelRef, Identifier, PublishRequest, PublishStatus, ResolvedRequest, SeoFields,
    TemplateVersion,
};
use crate::utils::slugify;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

const LOCAL_DATETIME_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
];

const IDENTIFIER_FIELDS: &[&str] = &["hotelId", "hotelUrl", "cityId"];

/// Defaults the validator falls back to, derived once from [`Settings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDefaults {
    pub version: TemplateVersion,
    pub category: u64,
    pub check_in_offset_days: u32,
    pub nights: u32,
    pub schedule_time: Time,
    pub utc_offset: UtcOffset,
}

impl ContentDefaults {
    pub fn from_settings(settings: &Settings) -> Self {
        let version = TemplateVersion::parse(&settings.content.default_version).unwrap_or_else(|| {
            tracing::warn!(
                value = %settings.content.default_version,
                "unknown default template version, using 'long'"
            );
            TemplateVersion::Long
        });

        let schedule_time =
            Time::from_hms(settings.publisher.schedule_hour, 0, 0).unwrap_or_else(|_| {
                tracing::warn!(
                    hour = settings.publisher.schedule_hour,
                    "schedule hour out of range, using 09:00"
                );
                Time::from_hms(9, 0, 0).unwrap_or(Time::MIDNIGHT)
            });

        let utc_offset = settings
            .publisher
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(|seconds| UtcOffset::from_whole_seconds(seconds).ok())
            .unwrap_or_else(|| {
                tracing::warn!(
                    minutes = settings.publisher.utc_offset_minutes,
                    "publish timezone offset out of range, using UTC"
                );
                UtcOffset::UTC
            });

        Self {
            version,
            category: settings.publisher.default_category,
            check_in_offset_days: settings.affiliate.check_in_offset_days,
            nights: settings.affiliate.nights.max(1),
            schedule_time,
            utc_offset,
        }
    }
}

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub error: String,
}

impl FieldError {
    fn new(field: &'static str, error: impl Into<String>) -> Self {
        Self {
            field,
            error: error.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid publish request ({} field error(s))", .errors.len())]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        let details = err
            .errors
            .iter()
            .map(|e| json!({ "field": e.field, "error": e.error }))
            .collect();
        AppError::validation(details, "publish request failed validation")
    }
}

/// Validate and normalize a publish request against `now`.
pub fn validate(
    request: PublishRequest,
    defaults: &ContentDefaults,
    now: OffsetDateTime,
) -> Result<ResolvedRequest, ValidationError> {
    let mut errors = Vec::new();
    let local_now = now.to_offset(defaults.utc_offset);

    let keyword = non_blank(request.keyword.as_deref());
    if keyword.is_none() {
        errors.push(FieldError::new("keyword", "required"));
    }

    let hotel_id = parse_identifier("hotelId", request.hotel_id.as_ref(), &mut errors);
    let hotel_url = parse_hotel_url(request.hotel_url.as_deref(), &mut errors);
    let city_id = parse_identifier("cityId", request.city_id.as_ref(), &mut errors);

    let hotel = match (hotel_id, &hotel_url, city_id) {
        (Some(id), _, _) => Some(HotelRef::Id(id)),
        (None, Some(url), _) => Some(HotelRef::Url(url.clone())),
        (None, None, Some(city)) => Some(HotelRef::City(city)),
        (None, None, None) => None,
    };
    if hotel.is_none() && !errors.iter().any(|e| IDENTIFIER_FIELDS.contains(&e.field)) {
        errors.push(FieldError::new(
            "hotelId",
            "one of hotelId, hotelUrl or cityId is required",
        ));
    }

    let requested_status = non_blank(request.publish_type.as_deref())
        .or_else(|| non_blank(request.status.as_deref()));
    let status = match requested_status {
        None => PublishStatus::Draft,
        Some(raw) => PublishStatus::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(value = %raw, "unrecognized publish status, defaulting to draft");
            PublishStatus::Draft
        }),
    };

    let version = match non_blank(request.version.as_deref()) {
        None => defaults.version,
        Some(raw) => TemplateVersion::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(value = %raw, default = ?defaults.version, "unrecognized template version");
            defaults.version
        }),
    };

    let category = request.category.unwrap_or(defaults.category);
    if category == 0 {
        errors.push(FieldError::new("category", "must be a positive integer"));
    }

    let check_in = match non_blank(request.check_in_date.as_deref()) {
        Some(raw) => parse_date("checkInDate", &raw, &mut errors),
        None => local_now
            .date()
            .checked_add(Duration::days(i64::from(defaults.check_in_offset_days))),
    };
    let check_out = match non_blank(request.check_out_date.as_deref()) {
        Some(raw) => parse_date("checkOutDate", &raw, &mut errors),
        None => check_in.and_then(|date| date.checked_add(Duration::days(i64::from(defaults.nights)))),
    };
    if let (Some(check_in), Some(check_out)) = (check_in, check_out) {
        if check_out <= check_in {
            errors.push(FieldError::new("checkOutDate", "must be after checkInDate"));
        }
    }

    let publish_at = match status {
        PublishStatus::Future => match non_blank(request.publish_at.as_deref()) {
            Some(raw) => parse_schedule(&raw, defaults.utc_offset, now, &mut errors),
            None => default_schedule(local_now, defaults.schedule_time),
        },
        PublishStatus::Draft | PublishStatus::Publish => None,
    };

    let canonical_url = non_blank(request.canonical_url.as_deref());
    if let Some(raw) = &canonical_url {
        if Url::parse(raw).is_err() {
            errors.push(FieldError::new("canonicalUrl", "must be an absolute URL"));
        }
    }

    let slug = non_blank(request.slug.as_deref())
        .or_else(|| keyword.clone())
        .and_then(|source| slugify(&source));

    match (keyword, hotel, check_in, check_out) {
        (Some(keyword), Some(hotel), Some(check_in), Some(check_out)) if errors.is_empty() => {
            Ok(ResolvedRequest {
                keyword,
                hotel,
                hotel_url,
                version,
                status,
                category,
                check_in,
                check_out,
                publish_at,
                slug,
                seo: SeoFields {
                    title: non_blank(request.seo_title.as_deref()),
                    description: non_blank(request.seo_description.as_deref()),
                    focus_keyword: non_blank(request.focus_keyword.as_deref()),
                    canonical_url,
                },
            })
        }
        _ => Err(ValidationError { errors }),
    }
}

/// Tomorrow at the configured hour, in the site's timezone.
pub fn default_schedule(local_now: OffsetDateTime, at: Time) -> Option<PrimitiveDateTime> {
    local_now
        .date()
        .next_day()
        .map(|tomorrow| PrimitiveDateTime::new(tomorrow, at))
}

pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_default()
}

/// `YYYY-MM-DDTHH:MM:SS`, the naive local form the publish target expects.
pub fn format_local_datetime(value: PrimitiveDateTime) -> String {
    value
        .format(LOCAL_DATETIME_FORMATS[0])
        .unwrap_or_default()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn parse_identifier(
    field: &'static str,
    value: Option<&Identifier>,
    errors: &mut Vec<FieldError>,
) -> Option<u64> {
    let parsed = match value? {
        Identifier::Number(n) => Some(*n),
        Identifier::Text(text) if text.trim().is_empty() => return None,
        Identifier::Text(text) => text.trim().parse::<u64>().ok(),
    };

    match parsed.filter(|id| *id > 0) {
        Some(id) => Some(id),
        None => {
            errors.push(FieldError::new(field, "must be a positive integer"));
            None
        }
    }
}

fn parse_hotel_url(value: Option<&str>, errors: &mut Vec<FieldError>) -> Option<Url> {
    let raw = non_blank(value)?;
    match Url::parse(&raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        _ => {
            errors.push(FieldError::new("hotelUrl", "must be an absolute http(s) URL"));
            None
        }
    }
}

fn parse_date(field: &'static str, raw: &str, errors: &mut Vec<FieldError>) -> Option<Date> {
    match Date::parse(raw, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(FieldError::new(field, "must be a YYYY-MM-DD date"));
            None
        }
    }
}

fn parse_schedule(
    raw: &str,
    utc_offset: UtcOffset,
    now: OffsetDateTime,
    errors: &mut Vec<FieldError>,
) -> Option<PrimitiveDateTime> {
    let parsed = OffsetDateTime::parse(raw, &Rfc3339)
        .map(|instant| {
            let local = instant.to_offset(utc_offset);
            PrimitiveDateTime::new(local.date(), local.time())
        })
        .ok()
        .or_else(|| {
            LOCAL_DATETIME_FORMATS
                .iter()
                .find_map(|format| PrimitiveDateTime::parse(raw, *format).ok())
        });

    match parsed {
        Some(local) if local.assume_offset(utc_offset) > now => Some(local),
        Some(_) => {
            errors.push(FieldError::new("publishAt", "must be in the future"));
            None
        }
        None => {
            errors.push(FieldError::new(
                "publishAt",
                "must be an RFC 3339 datetime or YYYY-MM-DDTHH:MM[:SS]",
            ));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, offset, time};

    const NOW: OffsetDateTime = datetime!(2026-10-18 14:30 UTC);

    fn defaults() -> ContentDefaults {
        ContentDefaults::from_settings(&Settings::default())
    }

    fn request() -> PublishRequest {
        PublishRequest {
            keyword: Some("Best Bangkok Riverside Hotel".into()),
            hotel_id: Some(Identifier::Number(12345)),
            ..Default::default()
        }
    }

    fn errors_of(request: PublishRequest) -> ValidationError {
        validate(request, &defaults(), NOW).unwrap_err()
    }

    #[test]
    fn minimal_request_gets_safe_defaults() {
        let resolved = validate(request(), &defaults(), NOW).unwrap();

        assert_eq!(resolved.keyword, "Best Bangkok Riverside Hotel");
        assert_eq!(resolved.hotel, HotelRef::Id(12345));
        assert_eq!(resolved.status, PublishStatus::Draft);
        assert_eq!(resolved.version, TemplateVersion::Long);
        assert_eq!(resolved.category, 1);
        assert_eq!(resolved.check_in, date!(2026 - 11 - 17));
        assert_eq!(resolved.check_out, date!(2026 - 11 - 18));
        assert_eq!(resolved.publish_at, None);
        assert_eq!(resolved.slug.as_deref(), Some("best-bangkok-riverside-hotel"));
    }

    #[test]
    fn missing_keyword_and_identifier_are_both_reported() {
        let err = errors_of(PublishRequest::default());
        assert!(err.has_field("keyword"));
        assert!(err.has_field("hotelId"));
        assert_eq!(err.errors.len(), 2);
    }

    #[test]
    fn blank_keyword_is_missing() {
        let err = errors_of(PublishRequest {
            keyword: Some("   ".into()),
            ..request()
        });
        assert_eq!(err.errors, vec![FieldError::new("keyword", "required")]);
    }

    #[test]
    fn identifier_priority_and_fallback_url() {
        let resolved = validate(
            PublishRequest {
                hotel_id: Some(Identifier::Text(" 777 ".into())),
                hotel_url: Some("https://www.agoda.com/hotel/x.html?hid=1".into()),
                city_id: Some(Identifier::Number(9395)),
                ..request()
            },
            &defaults(),
            NOW,
        )
        .unwrap();
        assert_eq!(resolved.hotel, HotelRef::Id(777));
        assert!(resolved.hotel_url.is_some());

        let resolved = validate(
            PublishRequest {
                hotel_id: None,
                city_id: Some(Identifier::Text("9395".into())),
                ..request()
            },
            &defaults(),
            NOW,
        )
        .unwrap();
        assert_eq!(resolved.hotel, HotelRef::City(9395));
    }

    #[test]
    fn malformed_identifiers_are_rejected() {
        let err = errors_of(PublishRequest {
            hotel_id: Some(Identifier::Text("abc".into())),
            ..request()
        });
        assert_eq!(err.errors.len(), 1);
        assert!(err.has_field("hotelId"));

        let err = errors_of(PublishRequest {
            hotel_id: Some(Identifier::Number(0)),
            ..request()
        });
        assert!(err.has_field("hotelId"));

        let err = errors_of(PublishRequest {
            hotel_id: None,
            hotel_url: Some("ftp://example.com/hotel".into()),
            ..request()
        });
        assert_eq!(err.errors.len(), 1);
        assert!(err.has_field("hotelUrl"));
    }

    #[test]
    fn unknown_enums_fall_back_to_defaults() {
        let resolved = validate(
            PublishRequest {
                publish_type: Some("pending-review".into()),
                version: Some("v42".into()),
                ..request()
            },
            &defaults(),
            NOW,
        )
        .unwrap();
        assert_eq!(resolved.status, PublishStatus::Draft);
        assert_eq!(resolved.version, TemplateVersion::Long);
    }

    #[test]
    fn future_without_publish_at_schedules_tomorrow_morning() {
        let resolved = validate(
            PublishRequest {
                publish_type: Some("future".into()),
                ..request()
            },
            &defaults(),
            NOW,
        )
        .unwrap();
        assert_eq!(resolved.publish_at, Some(datetime!(2026-10-19 09:00)));
        assert_eq!(
            format_local_datetime(resolved.publish_at.unwrap()),
            "2026-10-19T09:00:00"
        );
    }

    #[test]
    fn default_schedule_follows_site_timezone() {
        let mut defaults = defaults();
        defaults.utc_offset = offset!(+2);
        let late = datetime!(2026-10-18 23:30 UTC);

        let resolved = validate(
            PublishRequest {
                publish_type: Some("scheduled".into()),
                ..request()
            },
            &defaults,
            late,
        )
        .unwrap();
        // 01:30 on the 19th locally, so "tomorrow" is the 20th.
        assert_eq!(resolved.publish_at, Some(datetime!(2026-10-20 09:00)));
    }

    #[test]
    fn explicit_publish_at_is_converted_to_site_time() {
        let mut defaults = defaults();
        defaults.utc_offset = offset!(+7);

        let resolved = validate(
            PublishRequest {
                publish_type: Some("future".into()),
                publish_at: Some("2026-10-20T03:00:00Z".into()),
                ..request()
            },
            &defaults,
            NOW,
        )
        .unwrap();
        assert_eq!(resolved.publish_at, Some(datetime!(2026-10-20 10:00)));

        let resolved = validate(
            PublishRequest {
                publish_type: Some("future".into()),
                publish_at: Some("2026-10-21 18:15".into()),
                ..request()
            },
            &defaults,
            NOW,
        )
        .unwrap();
        assert_eq!(resolved.publish_at, Some(datetime!(2026-10-21 18:15)));
    }

    #[test]
    fn publish_at_is_ignored_unless_scheduled() {
        let resolved = validate(
            PublishRequest {
                publish_at: Some("2026-10-21T18:15:00".into()),
                ..request()
            },
            &defaults(),
            NOW,
        )
        .unwrap();
        assert_eq!(resolved.status, PublishStatus::Draft);
        assert_eq!(resolved.publish_at, None);
    }

    #[test]
    fn bad_or_past_publish_at_is_rejected() {
        for raw in ["next tuesday", "2026-10-01T09:00:00"] {
            let err = errors_of(PublishRequest {
                publish_type: Some("future".into()),
                publish_at: Some(raw.into()),
                ..request()
            });
            assert!(err.has_field("publishAt"), "{raw}");
        }
    }

    #[test]
    fn stay_dates_are_validated() {
        let err = errors_of(PublishRequest {
            check_in_date: Some("2026/12/01".into()),
            ..request()
        });
        assert!(err.has_field("checkInDate"));

        let err = errors_of(PublishRequest {
            check_in_date: Some("2026-12-05".into()),
            check_out_date: Some("2026-12-05".into()),
            ..request()
        });
        assert!(err.has_field("checkOutDate"));

        let resolved = validate(
            PublishRequest {
                check_in_date: Some("2026-12-05".into()),
                ..request()
            },
            &defaults(),
            NOW,
        )
        .unwrap();
        assert_eq!(resolved.check_out, date!(2026 - 12 - 06));
        assert_eq!(format_date(resolved.check_out), "2026-12-06");
    }

    #[test]
    fn slug_and_seo_fields_are_normalized() {
        let resolved = validate(
            PublishRequest {
                slug: Some("My Custom Slug!".into()),
                seo_title: Some("  ".into()),
                seo_description: Some(" Riverside stay ".into()),
                canonical_url: Some("https://blog.example.com/riverside".into()),
                category: Some(7),
                ..request()
            },
            &defaults(),
            NOW,
        )
        .unwrap();
        assert_eq!(resolved.slug.as_deref(), Some("my-custom-slug"));
        assert_eq!(resolved.seo.title, None);
        assert_eq!(resolved.seo.description.as_deref(), Some("Riverside stay"));
        assert_eq!(resolved.category, 7);

        let err = errors_of(PublishRequest {
            canonical_url: Some("/relative".into()),
            category: Some(0),
            ..request()
        });
        assert!(err.has_field("canonicalUrl"));
        assert!(err.has_field("category"));
    }

    #[test]
    fn defaults_tolerate_bad_settings() {
        let mut settings = Settings::default();
        settings.content.default_version = "short".into();
        settings.publisher.schedule_hour = 42;
        settings.publisher.utc_offset_minutes = 100_000;
        settings.affiliate.nights = 0;

        let defaults = ContentDefaults::from_settings(&settings);
        assert_eq!(defaults.version, TemplateVersion::Short);
        assert_eq!(defaults.schedule_time, time!(09:00));
        assert_eq!(defaults.utc_offset, UtcOffset::UTC);
        assert_eq!(defaults.nights, 1);
    }

    #[test]
    fn extreme_offsets_fall_back_to_utc() {
        for minutes in [i32::MAX, i32::MIN] {
            let mut settings = Settings::default();
            settings.publisher.utc_offset_minutes = minutes;
            assert_eq!(ContentDefaults::from_settings(&settings).utc_offset, UtcOffset::UTC);
        }
    }

    #[test]
    fn status_key_is_an_alternative_to_publish_type() {
        let resolved = validate(
            PublishRequest {
                status: Some("live".into()),
                ..request()
            },
            &defaults(),
            NOW,
        )
        .unwrap();
        assert_eq!(resolved.status, PublishStatus::Publish);

        let resolved = validate(
            PublishRequest {
                publish_type: Some("draft".into()),
                status: Some("publish".into()),
                ..request()
            },
            &defaults(),
            NOW,
        )
        .unwrap();
        assert_eq!(resolved.status, PublishStatus::Draft);
    }
}
