//! Preview model: the read-only view that templates render.
//!
//! Resolves display-time rules once so renderers don't repeat them: effective bullet
//! points, "Present" date ranges, hidden social links, and dynamic section ordering.

use serde::Serialize;

use crate::models::resume::{DynamicSectionData, PersonalInfo, ResumeData};

#[derive(Debug, Clone, Serialize)]
pub struct ResumePreview {
    pub header: HeaderPreview,
    pub experience: Vec<ExperiencePreview>,
    pub education: Vec<EducationPreview>,
    pub skills: Vec<SkillPreview>,
    pub sections: Vec<SectionPreview>,
    pub dynamic_sections: Vec<DynamicSectionPreview>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeaderPreview {
    pub full_name: String,
    pub title: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub summary: String,
    pub photo: Option<String>,
    /// `(label, url)` pairs, empty when social links are switched off.
    pub social_links: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperiencePreview {
    pub id: String,
    pub company: String,
    pub position: String,
    pub date_range: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EducationPreview {
    pub id: String,
    pub school: String,
    pub degree: String,
    pub field: String,
    pub date_range: String,
    pub gpa: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillPreview {
    pub id: String,
    pub name: String,
    pub level: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionPreview {
    pub id: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DynamicSectionPreview {
    pub id: String,
    pub title: String,
    pub section_type: &'static str,
    pub data: DynamicSectionData,
}

pub fn build_preview(data: &ResumeData) -> ResumePreview {
    ResumePreview {
        header: header(&data.personal_info, data.include_social_links),
        experience: data
            .experience
            .iter()
            .map(|exp| ExperiencePreview {
                id: exp.id.clone(),
                company: exp.company.clone(),
                position: exp.position.clone(),
                date_range: exp.date_range(),
                bullets: exp.effective_bullet_points(),
            })
            .collect(),
        education: data
            .education
            .iter()
            .map(|edu| EducationPreview {
                id: edu.id.clone(),
                school: edu.school.clone(),
                degree: edu.degree.clone(),
                field: edu.field.clone(),
                date_range: edu.date_range(),
                gpa: edu.gpa.clone().filter(|g| !g.trim().is_empty()),
            })
            .collect(),
        skills: data
            .skills
            .iter()
            .filter(|s| !s.name.trim().is_empty())
            .map(|s| SkillPreview {
                id: s.id.clone(),
                name: s.name.clone(),
                level: s.level,
            })
            .collect(),
        sections: data
            .sections
            .iter()
            .map(|s| SectionPreview {
                id: s.id.clone(),
                title: s.title.clone(),
                content: s.content.clone(),
            })
            .collect(),
        dynamic_sections: data
            .visible_dynamic_sections()
            .into_iter()
            .map(|s| DynamicSectionPreview {
                id: s.id.clone(),
                title: s.title.clone(),
                section_type: s.data.type_str(),
                data: s.data.clone(),
            })
            .collect(),
    }
}

fn header(info: &PersonalInfo, include_social_links: bool) -> HeaderPreview {
    let social_links = if include_social_links {
        [
            ("LinkedIn", &info.linkedin),
            ("GitHub", &info.github),
            ("Website", &info.website),
            ("Portfolio", &info.portfolio),
        ]
        .into_iter()
        .filter_map(|(label, url)| {
            url.as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(|u| (label.to_string(), u.to_string()))
        })
        .collect()
    } else {
        Vec::new()
    };

    HeaderPreview {
        full_name: info.full_name.clone(),
        title: info.title.clone(),
        email: info.email.clone(),
        phone: info.phone.clone(),
        location: info.location.clone(),
        summary: info.summary.clone(),
        photo: Some(info.photo.clone()).filter(|p| !p.is_empty()),
        social_links,
    }
}
