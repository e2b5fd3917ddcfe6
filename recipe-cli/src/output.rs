use crate::{cli::OutputFormat, error::Result};
#[cfg(feature = "colored-output")]
use colored::*;
use recipe_feed::RecipeSummary;
use serde::Serialize;

#[derive(Serialize)]
struct ListDocument<'a> {
    list: &'a str,
    count: usize,
    last_page: bool,
    recipes: &'a [RecipeSummary],
}

pub struct OutputManager {
    #[cfg_attr(not(feature = "colored-output"), allow(dead_code))]
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn format_recipes(
        &self,
        list: &str,
        recipes: &[RecipeSummary],
        last_page: bool,
        format: OutputFormat,
    ) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.format_pretty(list, recipes, last_page)),
            OutputFormat::Json => {
                let document = ListDocument {
                    list,
                    count: recipes.len(),
                    last_page,
                    recipes,
                };
                Ok(serde_json::to_string_pretty(&document)?)
            }
        }
    }

    fn format_pretty(&self, list: &str, recipes: &[RecipeSummary], last_page: bool) -> String {
        let mut output = String::new();
        output.push_str(&self.colorize(
            &format!("{} ({} recipes)", list, recipes.len()),
            &Color::Green,
            true,
        ));
        output.push('\n');

        if recipes.is_empty() {
            output.push_str("  Nothing here yet.\n");
        }

        for recipe in recipes {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize(&format!("#{}", recipe.id), &Color::Yellow, false),
                self.colorize(&recipe.title, &Color::Cyan, true)
            ));

            let mut details = Vec::new();
            if let Some(author) = &recipe.author_name {
                details.push(format!("by {author}"));
            }
            if let Some(minutes) = recipe.cooking_time_minutes {
                details.push(format!("{minutes} min"));
            }
            details.push(format!("{} likes", recipe.likes));
            if let Some(created_at) = recipe.created_at {
                details.push(created_at.format("%Y-%m-%d").to_string());
            }
            output.push_str(&format!("     {}\n", details.join(" · ")));

            if let Some(image) = &recipe.image_url {
                output.push_str(&format!(
                    "     {}\n",
                    self.colorize(image, &Color::Blue, false)
                ));
            }
        }

        if last_page {
            output.push_str(&self.colorize("End of list", &Color::Green, false));
        } else {
            output.push_str(&self.colorize(
                "More available (use --pages to load further)",
                &Color::Yellow,
                false,
            ));
        }
        output.push('\n');
        output
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Blue => text.blue(),
                    Color::Cyan => text.cyan(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (color, bold);
            text.to_string()
        }
    }
}

enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: i64, title: &str) -> RecipeSummary {
        RecipeSummary {
            id,
            title: title.to_string(),
            author_name: Some("mina".to_string()),
            image_url: None,
            cooking_time_minutes: Some(25),
            likes: 3,
            created_at: None,
        }
    }

    #[test]
    fn test_pretty_output() {
        let output = OutputManager::new(false)
            .format_recipes(
                "home-feed",
                &[recipe(1, "Kimchi stew")],
                true,
                OutputFormat::Pretty,
            )
            .unwrap();

        assert!(output.starts_with("home-feed (1 recipes)\n"));
        assert!(output.contains("#1 Kimchi stew"));
        assert!(output.contains("by mina · 25 min · 3 likes"));
        assert!(output.ends_with("End of list\n"));
    }

    #[test]
    fn test_json_output() {
        let output = OutputManager::new(false)
            .format_recipes(
                "bookmarks",
                &[recipe(7, "Bibimbap")],
                false,
                OutputFormat::Json,
            )
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["list"], "bookmarks");
        assert_eq!(value["count"], 1);
        assert_eq!(value["last_page"], false);
        assert_eq!(value["recipes"][0]["title"], "Bibimbap");
        assert_eq!(value["recipes"][0]["cookingTimeMinutes"], 25);
    }
}
