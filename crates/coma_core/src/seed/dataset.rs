//! Seed dataset description and the fixed demonstration dataset.
//!
//! Rows reference each other by position in their kind's list (for example
//! `ProjectSeed::funder = 1` means the second funder). The loader resolves
//! positions to ids as rows are created.

use crate::model::community::Visibility;
use crate::model::funding::ProjectStatus;
use crate::model::user::UserRole;

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSeed {
    pub bio: Option<&'static str>,
    pub orcid_id: Option<&'static str>,
    pub avatar_url: Option<&'static str>,
    pub research_areas: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserSeed {
    pub name: &'static str,
    pub email: &'static str,
    pub role: UserRole,
    pub affiliation: Option<&'static str>,
    pub profile: Option<ProfileSeed>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunderSeed {
    pub name: &'static str,
    pub description: Option<&'static str>,
    pub website: Option<&'static str>,
    pub country: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagSeed {
    pub name: &'static str,
    pub category: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSeed {
    pub title: &'static str,
    pub summary: &'static str,
    pub description: Option<&'static str>,
    /// ISO `YYYY-MM-DD`.
    pub start_date: &'static str,
    /// ISO `YYYY-MM-DD`.
    pub end_date: Option<&'static str>,
    pub funding_amount: f64,
    pub currency: &'static str,
    pub status: ProjectStatus,
    pub funder: usize,
    pub pi: Option<usize>,
    pub tags: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpaceSeed {
    pub name: &'static str,
    pub description: &'static str,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostSeed {
    pub space: usize,
    pub author: usize,
    pub title: &'static str,
    pub content: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentSeed {
    pub post: usize,
    pub author: usize,
    pub content: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSeed {
    pub project: usize,
    pub author: usize,
    pub content: &'static str,
    pub category: &'static str,
}

/// Complete set of rows to bulk-load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub users: Vec<UserSeed>,
    pub funders: Vec<FunderSeed>,
    pub tags: Vec<TagSeed>,
    pub projects: Vec<ProjectSeed>,
    pub spaces: Vec<SpaceSeed>,
    pub posts: Vec<PostSeed>,
    pub comments: Vec<CommentSeed>,
    pub annotations: Vec<AnnotationSeed>,
}

impl Dataset {
    /// The fixed COMA demonstration dataset.
    pub fn demo() -> Self {
        Self {
            users: demo_users(),
            funders: demo_funders(),
            tags: demo_tags(),
            projects: demo_projects(),
            spaces: demo_spaces(),
            posts: demo_posts(),
            comments: vec![CommentSeed {
                post: 0,
                author: 2,
                content: "This is fascinating! We encountered similar challenges in our water purification projects. Community engagement was key.",
            }],
            annotations: vec![AnnotationSeed {
                project: 1,
                author: 3,
                content: "Excellent progress on early cancer detection. This project has high impact potential and aligns well with EU healthcare priorities.",
                category: "High Impact",
            }],
        }
    }
}

fn demo_users() -> Vec<UserSeed> {
    vec![
        UserSeed {
            name: "Dr. Anna Schmidt",
            email: "anna.schmidt@example.com",
            role: UserRole::Researcher,
            affiliation: Some("TU Vienna"),
            profile: Some(ProfileSeed {
                bio: Some("Climate scientist researching sustainable energy solutions."),
                orcid_id: Some("0000-0001-2345-6789"),
                avatar_url: None,
                research_areas: vec!["Climate Science", "Renewable Energy", "Sustainability"],
            }),
        },
        UserSeed {
            name: "Prof. Michael Weber",
            email: "michael.weber@example.com",
            role: UserRole::Researcher,
            affiliation: Some("University of Zurich"),
            profile: Some(ProfileSeed {
                bio: Some("AI researcher focusing on healthcare applications."),
                orcid_id: Some("0000-0002-3456-7890"),
                avatar_url: None,
                research_areas: vec!["Artificial Intelligence", "Healthcare", "Machine Learning"],
            }),
        },
        UserSeed {
            name: "Dr. Sarah Johnson",
            email: "sarah.johnson@example.com",
            role: UserRole::Researcher,
            affiliation: Some("ETH Zurich"),
            profile: Some(ProfileSeed {
                bio: Some("Materials scientist working on nanotechnology applications."),
                orcid_id: Some("0000-0003-4567-8901"),
                avatar_url: None,
                research_areas: vec!["Materials Science", "Nanotechnology", "Engineering"],
            }),
        },
        UserSeed {
            name: "Emma Müller",
            email: "emma.mueller@ffg.at",
            role: UserRole::Funder,
            affiliation: Some("Austrian Research Promotion Agency (FFG)"),
            profile: None,
        },
        UserSeed {
            name: "Admin User",
            email: "admin@coma.example.com",
            role: UserRole::Admin,
            affiliation: None,
            profile: None,
        },
    ]
}

fn demo_funders() -> Vec<FunderSeed> {
    vec![
        FunderSeed {
            name: "Austrian Research Promotion Agency (FFG)",
            description: Some("The Austrian Research Promotion Agency (FFG) is the national funding agency for industrial research and development in Austria."),
            website: Some("https://www.ffg.at"),
            country: Some("Austria"),
        },
        FunderSeed {
            name: "European Commission - Horizon Europe",
            description: Some("The EU's key funding programme for research and innovation, tackling climate change, helping to achieve the UN's Sustainable Development Goals and boosting the EU's competitiveness and growth."),
            website: Some("https://ec.europa.eu/programmes/horizon-europe"),
            country: Some("European Union"),
        },
        FunderSeed {
            name: "Swiss National Science Foundation (SNSF)",
            description: Some("The Swiss National Science Foundation (SNSF) is a research funding organization mandated by the Swiss Confederation."),
            website: Some("https://www.snf.ch"),
            country: Some("Switzerland"),
        },
        FunderSeed {
            name: "German Research Foundation (DFG)",
            description: Some("The German Research Foundation (DFG) is the central independent research funding organisation in Germany."),
            website: Some("https://www.dfg.de"),
            country: Some("Germany"),
        },
    ]
}

fn demo_tags() -> Vec<TagSeed> {
    [
        ("Climate Change", "Environment"),
        ("Artificial Intelligence", "Technology"),
        ("Healthcare", "Medicine"),
        ("Renewable Energy", "Environment"),
        ("Machine Learning", "Technology"),
        ("Nanotechnology", "Technology"),
        ("Sustainability", "Environment"),
        ("Biotechnology", "Medicine"),
        ("Data Science", "Technology"),
        ("Cancer Research", "Medicine"),
    ]
    .into_iter()
    .map(|(name, category)| TagSeed {
        name,
        category: Some(category),
    })
    .collect()
}

fn demo_projects() -> Vec<ProjectSeed> {
    vec![
        ProjectSeed {
            title: "Sustainable Energy Solutions for Alpine Regions",
            summary: "This project investigates novel renewable energy solutions tailored for alpine environments, focusing on solar and wind integration.",
            description: Some("Detailed research on implementing sustainable energy infrastructure in challenging mountainous terrain, considering environmental impact and economic feasibility."),
            start_date: "2022-01-01",
            end_date: Some("2024-12-31"),
            funding_amount: 450_000.0,
            currency: "EUR",
            status: ProjectStatus::Active,
            funder: 0,
            pi: Some(0),
            // Climate Change, Renewable Energy, Sustainability
            tags: vec![0, 3, 6],
        },
        ProjectSeed {
            title: "AI-Powered Diagnostic Tools for Early Cancer Detection",
            summary: "Development of machine learning algorithms for analyzing medical imaging data to improve early detection of various cancer types.",
            description: Some("This interdisciplinary project combines expertise in artificial intelligence, medical imaging, and oncology to create diagnostic tools that can identify cancer at earlier stages."),
            start_date: "2021-06-01",
            end_date: Some("2024-05-31"),
            funding_amount: 850_000.0,
            currency: "EUR",
            status: ProjectStatus::Active,
            funder: 1,
            pi: Some(1),
            // AI, Healthcare, Machine Learning, Cancer Research
            tags: vec![1, 2, 4, 9],
        },
        ProjectSeed {
            title: "Nanomaterials for Water Purification in Developing Countries",
            summary: "Research into cost-effective nanomaterial-based water filtration systems for communities lacking access to clean water.",
            description: Some("This project develops innovative nanomaterial filters that can remove contaminants from water sources at low cost, suitable for deployment in resource-limited settings."),
            start_date: "2023-01-01",
            end_date: Some("2025-12-31"),
            funding_amount: 320_000.0,
            currency: "CHF",
            status: ProjectStatus::Active,
            funder: 2,
            pi: Some(2),
            // Nanotechnology, Sustainability
            tags: vec![5, 6],
        },
        ProjectSeed {
            title: "Climate Impact Assessment of Urban Green Spaces",
            summary: "Comprehensive study on how urban green infrastructure affects local climate patterns and air quality in European cities.",
            description: Some("Multi-city analysis using remote sensing, ground measurements, and climate modeling to quantify the benefits of urban forests and parks."),
            start_date: "2020-03-01",
            end_date: Some("2023-02-28"),
            funding_amount: 275_000.0,
            currency: "EUR",
            status: ProjectStatus::Completed,
            funder: 3,
            pi: Some(0),
            // Climate Change, Sustainability
            tags: vec![0, 6],
        },
        ProjectSeed {
            title: "Predictive Models for Pandemic Response Optimization",
            summary: "Development of data-driven models to optimize healthcare resource allocation during pandemic scenarios.",
            description: Some("Using historical pandemic data and machine learning to create predictive tools for hospital capacity planning, vaccine distribution, and supply chain management."),
            start_date: "2021-01-01",
            end_date: Some("2023-12-31"),
            funding_amount: 650_000.0,
            currency: "EUR",
            status: ProjectStatus::Completed,
            funder: 1,
            pi: Some(1),
            // AI, Healthcare, Data Science
            tags: vec![1, 2, 8],
        },
    ]
}

fn demo_spaces() -> Vec<SpaceSeed> {
    vec![
        SpaceSeed {
            name: "Climate Research",
            description: "Discussion space for climate scientists, environmental researchers, and sustainability experts.",
            visibility: Visibility::Public,
        },
        SpaceSeed {
            name: "AI for Healthcare",
            description: "Community for researchers working at the intersection of artificial intelligence and healthcare.",
            visibility: Visibility::Public,
        },
        SpaceSeed {
            name: "Nanotechnology Applications",
            description: "Forum for discussing practical applications of nanotechnology across industries.",
            visibility: Visibility::Public,
        },
    ]
}

fn demo_posts() -> Vec<PostSeed> {
    vec![
        PostSeed {
            space: 0,
            author: 0,
            title: "Lessons from Alpine Renewable Energy Projects",
            content: "After two years of fieldwork in alpine regions, I've learned that successful renewable energy implementation requires deep understanding of local conditions and community engagement. Happy to share our findings and discuss challenges.",
        },
        PostSeed {
            space: 1,
            author: 1,
            title: "New Advances in Medical Image Analysis",
            content: "Our team has achieved 95% accuracy in early-stage cancer detection using deep learning. Looking forward to collaborating with other researchers in this field. What are the biggest challenges you face?",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::Dataset;

    #[test]
    fn demo_dataset_has_expected_shape() {
        let dataset = Dataset::demo();
        assert_eq!(dataset.users.len(), 5);
        assert_eq!(
            dataset.users.iter().filter(|user| user.profile.is_some()).count(),
            3
        );
        assert_eq!(dataset.funders.len(), 4);
        assert_eq!(dataset.tags.len(), 10);
        assert_eq!(dataset.projects.len(), 5);
        assert_eq!(
            dataset
                .projects
                .iter()
                .map(|project| project.tags.len())
                .sum::<usize>(),
            14
        );
        assert_eq!(dataset.spaces.len(), 3);
        assert_eq!(dataset.posts.len(), 2);
        assert_eq!(dataset.comments.len(), 1);
        assert_eq!(dataset.annotations.len(), 1);
    }

    #[test]
    fn demo_references_stay_in_bounds() {
        let dataset = Dataset::demo();
        for project in &dataset.projects {
            assert!(project.funder < dataset.funders.len());
            assert!(project.pi.map_or(true, |pi| pi < dataset.users.len()));
            assert!(project.tags.iter().all(|tag| *tag < dataset.tags.len()));
        }
        for post in &dataset.posts {
            assert!(post.space < dataset.spaces.len());
            assert!(post.author < dataset.users.len());
        }
    }
}
