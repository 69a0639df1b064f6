//! Rendering of aggregate alerts into localized, destination-ready content.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::alert::AlertSnapshot;
use crate::content::{ContentField, Priority, RenderedContent};
use crate::destination::Language;
use crate::event::Category;
use crate::regions::{RegionDirectory, RegionName, StaticRegionDirectory};

/// Renders an alert snapshot for one language.
///
/// Called once per language per (re)publication, never while any engine lock
/// is held.
pub trait Presenter: Send + Sync {
    fn render(&self, alert: &AlertSnapshot, language: Language) -> RenderedContent;
}

/// Default presenter with built-in strings for every [`Language`].
pub struct TextPresenter {
    directory: Arc<dyn RegionDirectory>,
}

impl TextPresenter {
    pub fn new(directory: Arc<dyn RegionDirectory>) -> Self {
        Self { directory }
    }

    fn region_name(&self, region: &crate::event::RegionId, language: Language) -> RegionName {
        self.directory
            .display_name(region, language)
            .unwrap_or_else(|| RegionName {
                name: region.to_string(),
                area: region.to_string(),
            })
    }
}

impl Default for TextPresenter {
    fn default() -> Self {
        Self::new(Arc::new(StaticRegionDirectory::default()))
    }
}

impl Presenter for TextPresenter {
    fn render(&self, alert: &AlertSnapshot, language: Language) -> RenderedContent {
        let title = match alert.category {
            Some(category) if alert.evidence_count > 1 => {
                format!("{} ({})", category_title(category, language), alert.evidence_count)
            }
            Some(category) => category_title(category, language).to_string(),
            None => String::new(),
        };
        let instructions = instruction_text(&alert.instructions, alert.safety_seconds, language);

        let mut areas: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut names = Vec::with_capacity(alert.region_ids.len());
        let mut hashtags = Vec::with_capacity(alert.region_ids.len());
        for region in &alert.region_ids {
            let display = self.region_name(region, language);
            hashtags.push(hashtag(&display.name));
            names.push(display.name.clone());
            areas.entry(display.area).or_default().push(display.name);
        }

        let fields = areas
            .into_iter()
            .map(|(area, names)| {
                let value = if names.len() == 1 && names[0] == area {
                    String::new()
                } else {
                    names.join("\n")
                };
                ContentField { title: area, value }
            })
            .collect();

        let event_over = alert.instructions == "uav_event_over";
        let priority = match alert.category {
            _ if event_over => Priority::Normal,
            None => Priority::Normal,
            Some(Category::Biohazard) => Priority::Important,
            Some(_) if alert.instructions == "lockdown" => Priority::Important,
            Some(_) => Priority::Urgent,
        };

        let text = if event_over {
            String::new()
        } else {
            let mut lines = Vec::new();
            if !names.is_empty() {
                lines.push(names.join(", "));
            }
            lines.push(instructions.clone());
            if !hashtags.is_empty() {
                lines.push(hashtags.join(" "));
            }
            lines.join("\n")
        };

        RenderedContent {
            title,
            instructions,
            text,
            fields,
            priority,
            requested_ack: alert.safety_seconds >= 60,
        }
    }
}

fn hashtag(name: &str) -> String {
    let cleaned: String = name
        .replace(" - ", " ")
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | ',' | '-'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    format!("#{}", cleaned)
}

fn category_title(category: Category, language: Language) -> &'static str {
    use Category::*;
    use Language::*;

    match (category, language) {
        (Rockets, En) => "Rocket and missile fire",
        (Rockets, He) => "ירי רקטות וטילים",
        (Rockets, Ru) => "Ракетный обстрел",
        (Rockets, Ar) => "إطلاق قذائف وصواريخ",
        (Earthquake, En) => "Earthquake",
        (Earthquake, He) => "רעידת אדמה",
        (Earthquake, Ru) => "Землетрясение",
        (Earthquake, Ar) => "هزة أرضية",
        (Radiological, En) => "Radiological event",
        (Radiological, He) => "אירוע רדיולוגי",
        (Radiological, Ru) => "Радиологическое событие",
        (Radiological, Ar) => "حدث إشعاعي",
        (Tsunami, En) => "Tsunami",
        (Tsunami, He) => "צונאמי",
        (Tsunami, Ru) => "Цунами",
        (Tsunami, Ar) => "تسونامي",
        (Uav, En) => "Hostile aircraft intrusion",
        (Uav, He) => "חדירת כלי טיס עוין",
        (Uav, Ru) => "Проникновение враждебного летательного аппарата",
        (Uav, Ar) => "تسلل طائرة معادية",
        (Biohazard, En) => "Hazardous materials event",
        (Biohazard, He) => "אירוע חומרים מסוכנים",
        (Biohazard, Ru) => "Утечка опасных веществ",
        (Biohazard, Ar) => "حدث مواد خطرة",
        (Infiltration, En) => "Terrorist infiltration",
        (Infiltration, He) => "חדירת מחבלים",
        (Infiltration, Ru) => "Проникновение террористов",
        (Infiltration, Ar) => "تسلل مخربين",
    }
}

fn instruction_template(key: &str, language: Language) -> Option<&'static str> {
    use Language::*;

    let template = match (key, language) {
        ("instructions", En) => "Enter the protected space {window} and stay there for 10 minutes",
        ("instructions", He) => "היכנסו למרחב המוגן {window} ושהו בו 10 דקות",
        ("instructions", Ru) => "Войдите в защищённое помещение {window} и оставайтесь там 10 минут",
        ("instructions", Ar) => "ادخلوا إلى الحيز المحمي {window} وابقوا فيه 10 دقائق",
        ("lockdown", En) => "Enter a building, lock the doors and windows",
        ("lockdown", He) => "היכנסו למבנה, נעלו את הדלתות והחלונות",
        ("lockdown", Ru) => "Войдите в здание, заприте двери и окна",
        ("lockdown", Ar) => "ادخلوا إلى مبنى وأغلقوا الأبواب والنوافذ",
        ("uav_instructions", En) => "Enter the protected space and stay there",
        ("uav_instructions", He) => "היכנסו למרחב המוגן ושהו בו",
        ("uav_instructions", Ru) => "Войдите в защищённое помещение и оставайтесь там",
        ("uav_instructions", Ar) => "ادخلوا إلى الحيز المحمي وابقوا فيه",
        ("uav_event_over" | "event_over", En) => "The event has ended",
        ("uav_event_over" | "event_over", He) => "האירוע הסתיים",
        ("uav_event_over" | "event_over", Ru) => "Событие завершилось",
        ("uav_event_over" | "event_over", Ar) => "انتهى الحدث",
        _ => return None,
    };
    Some(template)
}

fn safety_window(seconds: u32, language: Language) -> String {
    if seconds == 0 {
        return match language {
            Language::En => "immediately",
            Language::He => "מיד",
            Language::Ru => "немедленно",
            Language::Ar => "فوراً",
        }
        .to_string();
    }
    match language {
        Language::En => format!("within {} seconds", seconds),
        Language::He => format!("תוך {} שניות", seconds),
        Language::Ru => format!("в течение {} секунд", seconds),
        Language::Ar => format!("خلال {} ثانية", seconds),
    }
}

fn instruction_text(key: &str, safety_seconds: u32, language: Language) -> String {
    match instruction_template(key, language) {
        Some(template) => template.replace("{window}", &safety_window(safety_seconds, language)),
        None => key.to_string(),
    }
}
