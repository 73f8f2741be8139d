//! Site templates using the Tera template engine
//!
//! All templates are embedded directly in the binary.

use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::admin::DashboardStats;
use crate::config::SiteConfig;
use crate::content::{Article, Category, ImageRef, RenderedArticle};
use crate::helpers::{date_xml, format_date, full_url_for, open_graph, preview, relative_date, truncate};
use crate::records::Facilitator;

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
    config: SiteConfig,
    site: SiteData,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let mut tera = Tera::default();

        // Register all templates. Autoescaping stays on for .html; rendered
        // article bodies are sanitized and marked `safe` in the templates.
        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("blog.html", include_str!("site/blog.html")),
            ("article.html", include_str!("site/article.html")),
            ("facilitator.html", include_str!("site/facilitator.html")),
            ("admin_login.html", include_str!("site/admin_login.html")),
            ("admin_dashboard.html", include_str!("site/admin_dashboard.html")),
            ("error.html", include_str!("site/error.html")),
            // Partials
            ("partials/head.html", include_str!("site/partials/head.html")),
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
            (
                "partials/footer.html",
                include_str!("site/partials/footer.html"),
            ),
        ])?;

        // Register custom filters
        tera.register_filter("truncate_chars", truncate_chars_filter);
        tera.register_filter("full_date", date_filter(config.date_format.clone()));
        tera.register_filter("date_xml", date_xml_filter);
        tera.register_filter("relative_date", relative_date_filter);

        Ok(Self {
            tera,
            config: config.clone(),
            site: SiteData::from_config(config),
        })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    fn context(&self, page_title: Option<&str>) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context.insert("year", &Utc::now().year());
        context.insert("page_title", &page_title);
        context.insert("newsletter_notice", &None::<&str>);
        context
    }

    /// The blog index, optionally narrowed to a category and search term
    pub fn blog_index(
        &self,
        articles: &[&Article],
        categories: &[Category],
        category: Option<&Category>,
        search: &str,
        notice: Option<&str>,
    ) -> Result<String> {
        let mut context = self.context(category.map(|c| c.name.as_str()));
        context.insert("newsletter_notice", &notice);
        context.insert(
            "articles",
            &articles.iter().map(|a| ArticleView::from(*a)).collect::<Vec<_>>(),
        );
        context.insert(
            "categories",
            &categories.iter().map(CategoryView::from).collect::<Vec<_>>(),
        );
        context.insert("category", &category.map(CategoryView::from));
        context.insert("search", search);
        self.render("blog.html", &context)
    }

    pub fn article_page(&self, article: &Article, rendered: &RenderedArticle) -> Result<String> {
        let mut context = self.context(Some(article.title.as_str()));
        let description = if article.excerpt.trim().is_empty() {
            preview(&article.content, 200)
        } else {
            truncate(&article.excerpt, 200, None)
        };
        context.insert("page_description", &description);
        context.insert(
            "meta_tags",
            &open_graph(
                &article.title,
                &description,
                &full_url_for(&self.config, &article.path()),
                article.image.as_ref().map(|image| image.url.as_str()),
                &self.site.title,
            ),
        );
        context.insert("article", &ArticleView::from(article));
        context.insert("hero", &rendered.hero_html());
        context.insert("body", &rendered.body_html());
        self.render("article.html", &context)
    }

    pub fn facilitator_page(&self, facilitator: Option<&Facilitator>) -> Result<String> {
        let mut context = self.context(facilitator.map(|f| f.name.as_str()));
        context.insert("facilitator", &facilitator);
        self.render("facilitator.html", &context)
    }

    pub fn login_page(&self, notice: Option<&str>) -> Result<String> {
        let mut context = self.context(Some("Admin Login"));
        context.insert("notice", &notice);
        self.render("admin_login.html", &context)
    }

    pub fn dashboard_page(
        &self,
        user_email: &str,
        stats: &DashboardStats,
        articles: &[Article],
    ) -> Result<String> {
        let mut context = self.context(Some("Dashboard"));
        context.insert("user_email", user_email);
        context.insert("stats", stats);
        context.insert("drafts", &stats.draft_articles());
        context.insert(
            "articles",
            &articles.iter().map(ArticleView::from).collect::<Vec<_>>(),
        );
        self.render("admin_dashboard.html", &context)
    }

    pub fn error_page(&self, status: u16, message: &str) -> Result<String> {
        let mut context = self.context(Some(message));
        context.insert("status", &status);
        context.insert("message", message);
        self.render("error.html", &context)
    }
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };
    Ok(tera::Value::String(truncate(&s, length, Some(&omission))))
}

fn parse_timestamp(filter: &str, value: &tera::Value) -> tera::Result<Option<DateTime<Utc>>> {
    let s = tera::try_get_value!(filter, "value", String, value);
    Ok(DateTime::parse_from_rfc3339(&s)
        .ok()
        .map(|date| date.with_timezone(&Utc)))
}

/// Tera filter: RFC 3339 timestamp in the configured display format
fn date_filter(
    format: String,
) -> impl Fn(&tera::Value, &HashMap<String, tera::Value>) -> tera::Result<tera::Value> + Send + Sync
{
    move |value, _args| match parse_timestamp("full_date", value)? {
        Some(date) => Ok(tera::Value::String(format_date(&date, &format))),
        // Leave unparseable values as they are
        None => Ok(value.clone()),
    }
}

fn date_xml_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    match parse_timestamp("date_xml", value)? {
        Some(date) => Ok(tera::Value::String(date_xml(&date))),
        None => Ok(value.clone()),
    }
}

/// Tera filter: "2 hours ago"
fn relative_date_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    match parse_timestamp("relative_date", value)? {
        Some(date) => Ok(tera::Value::String(relative_date(&date, &Utc::now()))),
        None => Ok(value.clone()),
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub url: String,
}

impl SiteData {
    fn from_config(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            url: config.url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleView {
    pub id: String,
    pub title: String,
    pub path: String,
    pub excerpt: String,
    pub author: String,
    pub category: String,
    pub category_path: String,
    pub published: bool,
    pub date: DateTime<Utc>,
    pub image: Option<ImageRef>,
}

impl From<&Article> for ArticleView {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            path: article.path(),
            excerpt: article.excerpt.clone(),
            author: article.author.clone(),
            category: article.category.clone(),
            category_path: Category::new(&article.category).path(),
            published: article.published,
            date: article.date,
            image: article.image.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub name: String,
    pub slug: String,
    pub count: usize,
    pub path: String,
}

impl From<&Category> for CategoryView {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            slug: category.slug.clone(),
            count: category.count,
            path: category.path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{render_article, BlogListing, ListingFilter};

    fn article(id: &str, title: &str, category: &str, content: &str) -> Article {
        let date = DateTime::parse_from_rfc3339("2024-03-05T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Article {
            id: id.into(),
            title: title.into(),
            excerpt: "An <excerpt>".into(),
            content: content.into(),
            author: "N.L. Bhattarai".into(),
            category: category.into(),
            published: true,
            image: None,
            secondary_images: [None, None],
            slug: None,
            date,
            created_at: date,
            updated_at: date,
        }
    }

    fn renderer() -> TemplateRenderer {
        TemplateRenderer::new(&SiteConfig::default()).unwrap()
    }

    #[test]
    fn test_blog_index() {
        let listing = BlogListing::from_articles(vec![
            article("1", "First Post", "Beliefs", "<p>a</p>"),
            article("2", "Second Post", "Habits", "<p>b</p>"),
        ]);
        let categories = listing.categories();
        let articles = listing.filter(&ListingFilter::default());
        let html = renderer()
            .blog_index(&articles, &categories, None, "", None)
            .unwrap();
        assert!(html.contains(r#"href="/blog/first-post""#));
        assert!(html.contains("/blog/category/habits"));
        assert!(html.contains("March 5, 2024"));
        // excerpts are escaped
        assert!(html.contains("An &lt;excerpt&gt;"));
        assert!(!html.contains(r#"class="newsletter-notice""#));

        let html = renderer()
            .blog_index(&articles, &categories, None, "", Some("Please enter a valid email address"))
            .unwrap();
        assert!(html.contains(
            r#"<p class="newsletter-notice" role="status">Please enter a valid email address</p>"#
        ));
    }

    #[test]
    fn test_article_page_renders_sanitized_body() {
        let article = article(
            "1",
            "Hello",
            "Beliefs",
            r#"<p>one</p><script>alert(1)</script><p>two</p>"#,
        );
        let rendered = render_article(&article);
        let html = renderer().article_page(&article, &rendered).unwrap();
        assert!(html.contains(r#"<div class="block"><p>one</p></div>"#));
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"<meta property="og:url" content="http://localhost:4000/blog/hello">"#));
    }

    #[test]
    fn test_login_notice() {
        let html = renderer()
            .login_page(Some("Please login to access this page"))
            .unwrap();
        assert!(html.contains(r#"<p class="notice">Please login to access this page</p>"#));
        assert!(!renderer().login_page(None).unwrap().contains("class=\"notice\""));
    }

    #[test]
    fn test_error_page() {
        let html = renderer().error_page(404, "Blog post not found").unwrap();
        assert!(html.contains("<h1>404</h1>"));
    }

    #[test]
    fn test_date_filters() {
        let value = tera::Value::String("2024-01-01T08:00:00+00:00".into());
        let full_date = date_filter("%B %-d, %Y".into());
        assert_eq!(
            full_date(&value, &HashMap::new()).unwrap(),
            tera::Value::String("January 1, 2024".into())
        );
        let iso = date_filter("%Y-%m-%d".into());
        assert_eq!(
            iso(&value, &HashMap::new()).unwrap(),
            tera::Value::String("2024-01-01".into())
        );
        assert_eq!(
            date_xml_filter(&value, &HashMap::new()).unwrap(),
            tera::Value::String("2024-01-01T08:00:00.000+00:00".into())
        );

        let garbage = tera::Value::String("soon".into());
        assert_eq!(full_date(&garbage, &HashMap::new()).unwrap(), garbage);
    }

    #[test]
    fn test_description_falls_back_to_content() {
        let mut article = article("1", "Hello", "Beliefs", "<p>Body <b>text</b></p>");
        article.excerpt = String::new();
        let rendered = render_article(&article);
        let html = renderer().article_page(&article, &rendered).unwrap();
        assert!(html.contains(r#"<meta property="og:description" content="Body text">"#));

        article.content = "<p>Tom &amp; Jerry</p>".into();
        let rendered = render_article(&article);
        let html = renderer().article_page(&article, &rendered).unwrap();
        assert!(html.contains(r#"<meta property="og:description" content="Tom &amp; Jerry">"#));
        assert!(html.contains(r#"<meta name="description" content="Tom &amp; Jerry">"#));
        assert!(!html.contains("&amp;amp;"));
    }
}
