use log::{error, info};
use reqwest::Url;
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::analytics::{
    track_poll_launch, track_poll_share, track_topic_generation, track_user_engagement,
};
use crate::error::{ApiError, PollResult};
use crate::handlers::{App, Page, Terminal};
use crate::models::{CommunityContext, Topic, TopicRequest};

const DEFAULT_LOCATION: &str = "Downtown San Francisco";
const DEFAULT_POPULATION: &str = "50000";

pub struct CommunityType {
    pub name: &'static str,
    // (value sent to the service, label shown to the user)
    pub domains: &'static [(&'static str, &'static str)],
}

pub const COMMUNITY_TYPES: &[CommunityType] = &[
    CommunityType {
        name: "Urban Community",
        domains: &[
            ("auto", "Surprise me!"),
            ("crime-public-safety", "Crime and Public Safety"),
            ("housing-affordability", "Housing Affordability"),
            ("economic-development", "Economic Development"),
            ("infrastructure-services", "Infrastructure & City Services"),
            ("transportation", "Transportation"),
        ],
    },
    CommunityType {
        name: "Suburban Town",
        domains: &[
            ("auto", "Surprise me!"),
            ("traffic-school-safety", "Traffic Congestion & School Safety"),
            ("infrastructure-maintenance", "Infrastructure Maintenance"),
            ("school-quality", "School Quality & Segregation"),
            ("property-taxes", "Property Taxes"),
            ("environmental-concerns", "Environmental Concerns"),
        ],
    },
    CommunityType {
        name: "Rural Area",
        domains: &[
            ("auto", "Surprise me!"),
            ("digital-infrastructure", "Digital Infrastructure Gap"),
            ("healthcare-access", "Healthcare Access"),
            ("economic-opportunities", "Economic Opportunities"),
            ("aging-population", "Aging Population Services"),
            ("infrastructure-decay", "Infrastructure Decay"),
        ],
    },
    CommunityType {
        name: "University Town",
        domains: &[
            ("auto", "Surprise me!"),
            ("student-housing-shortage", "Student Housing Shortage"),
            ("town-gown-relations", "Town-Gown Relations"),
            ("parking-transportation", "Parking and Transportation"),
            ("noise-disruption", "Noise and Disruption"),
            ("economic-dependence", "Economic Dependence on University"),
        ],
    },
];

/// Unknown community types fall back to the urban catalogue.
pub fn community_type(name: &str) -> &'static CommunityType {
    COMMUNITY_TYPES
        .iter()
        .find(|community| community.name.eq_ignore_ascii_case(name.trim()))
        .unwrap_or(&COMMUNITY_TYPES[0])
}

pub fn share_link(base: &Url, poll_id: &str) -> String {
    let mut url = base.clone();
    match url.path_segments_mut() {
        Ok(mut segments) => {
            segments.pop_if_empty().extend(["poll", "shared", poll_id]);
        }
        Err(_) => return format!("{}/poll/shared/{}", base.as_str().trim_end_matches('/'), poll_id),
    }
    url.to_string()
}

/// Saves the topic to the poll store and returns its share link.
pub async fn share_topic(app: &App, topic: &Topic) -> Result<String, ApiError> {
    let creator_name = app.storage.load_user_name().await.ok().flatten().unwrap_or_default();
    let poll_id = app.polls.save(topic, &creator_name).await?;
    track_user_engagement("poll_shared", Some(&format!("poll_id: {}", poll_id)));
    track_poll_share(&poll_id, "copy_link");
    Ok(share_link(&app.share_base_url, &poll_id))
}

async fn choose<R, W>(
    term: &mut Terminal<R, W>,
    title: &str,
    options: &[&str],
) -> PollResult<Option<usize>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    term.say(title).await?;
    for (i, option) in options.iter().enumerate() {
        term.say(&format!("  {}. {}", i + 1, option)).await?;
    }
    loop {
        let Some(answer) = term.prompt("Choice [1]:").await? else {
            return Ok(None);
        };
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(Some(0));
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Ok(Some(n - 1)),
            _ => term.say(&format!("Please pick a number from 1 to {}.", options.len())).await?,
        }
    }
}

async fn prompt_with_default<R, W>(
    term: &mut Terminal<R, W>,
    question: &str,
    default: &str,
) -> PollResult<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let answer = term.prompt(&format!("{} [{}]:", question, default)).await?;
    Ok(answer.map(|answer| match answer.trim() {
        "" => default.to_string(),
        trimmed => trimmed.to_string(),
    }))
}

pub fn render_topic(topic: &Topic) -> String {
    let mut text = format!("\n=== {} ===\n{}\n", topic.title, topic.description);
    if let Some(theme) = &topic.main_theme {
        text.push_str(&format!("Theme: {}\n", theme));
    }

    text.push_str(&format!("\nStatements ({}):\n", topic.statements.len()));
    for (i, statement) in topic.statements.iter().enumerate() {
        text.push_str(&format!("  {}. {} [{}]\n", i + 1, statement.text, statement.category));
    }

    text.push_str(&format!("\nOpinion clusters ({}):\n", topic.expected_clusters.len()));
    for cluster in &topic.expected_clusters {
        text.push_str(&format!("  - {}: {}\n", cluster.name, cluster.description));
    }
    text
}

// The topic generator form, and the page every missing-state redirect lands on
pub async fn entry_page<R, W>(app: &App, term: &mut Terminal<R, W>) -> PollResult<Page>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    term.say("\nCommunity Topic Generator").await?;

    let names: Vec<&str> = COMMUNITY_TYPES.iter().map(|c| c.name).collect();
    let Some(type_index) = choose(term, "Community type:", &names).await? else {
        return Ok(Page::Exit);
    };
    let community = &COMMUNITY_TYPES[type_index];

    let Some(location) = prompt_with_default(term, "Location", DEFAULT_LOCATION).await? else {
        return Ok(Page::Exit);
    };
    let Some(population) = prompt_with_default(term, "Population", DEFAULT_POPULATION).await? else {
        return Ok(Page::Exit);
    };
    let population_size = population.replace(',', "").parse::<u64>().ok();

    let labels: Vec<&str> = community.domains.iter().map(|(_, label)| *label).collect();
    let Some(domain_index) = choose(term, "Topic domain:", &labels).await? else {
        return Ok(Page::Exit);
    };
    let topic_domain = community.domains[domain_index].0;

    loop {
        term.say("Generating topic...").await?;
        let request = TopicRequest::new(
            CommunityContext::new(location.clone(), population_size),
            Some(topic_domain),
        );

        let topic = match app.topics.generate(&request).await {
            Ok(topic) => topic,
            Err(e) => {
                error!("Error generating topic: {}", e);
                term.say("Failed to generate topic. Please make sure the backend server is running.")
                    .await?;
                match term.prompt("Try again? [y/N]").await? {
                    Some(answer) if answer.trim().eq_ignore_ascii_case("y") => continue,
                    _ => return Ok(Page::Exit),
                }
            }
        };

        let method = topic.metadata.generation_method.as_deref().unwrap_or("unknown");
        track_topic_generation(&location, topic_domain, method);
        info!("Generated topic '{}' via {}", topic.title, method);
        term.say(&render_topic(&topic)).await?;

        loop {
            let Some(action) = term
                .prompt("[l]aunch poll, [s]hare poll, [g]enerate another, [q]uit >")
                .await?
            else {
                return Ok(Page::Exit);
            };

            match action.trim().to_ascii_lowercase().as_str() {
                "l" | "launch" => {
                    app.storage.save_topic(&topic).await?;
                    track_poll_launch(&topic.title);
                    return Ok(Page::Poll);
                }
                "s" | "share" => match share_topic(app, &topic).await {
                    Ok(link) => term.say(&format!("Share this link: {}", link)).await?,
                    Err(e) => {
                        error!("Error sharing poll: {}", e);
                        term.say("Failed to create shareable link. Please try again.").await?;
                    }
                },
                "g" | "generate" => break,
                "q" | "quit" => return Ok(Page::Exit),
                _ => term.say("Please choose l, s, g or q.").await?,
            }
        }
    }
}
