use serde::Serialize;

/// Static subject/topic/grade reference data. The catalog is a leaf: pure
/// in-memory lookup tables, no persistence.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: &'static str,
    pub subject: &'static str,
    pub grade: &'static str,
    pub title: &'static str,
}

pub const SUBJECTS: &[&str] = &[
    "Mathematics",
    "Physics",
    "Chemistry",
    "Biology",
    "English",
    "Computer Science",
];

pub const GRADES: &[&str] = &["9", "10", "11", "12"];

pub const TOPICS: &[Topic] = &[
    Topic { id: "mat-09-01", subject: "Mathematics", grade: "9", title: "Number Systems" },
    Topic { id: "mat-09-02", subject: "Mathematics", grade: "9", title: "Polynomials" },
    Topic { id: "mat-09-03", subject: "Mathematics", grade: "9", title: "Linear Equations in Two Variables" },
    Topic { id: "mat-10-01", subject: "Mathematics", grade: "10", title: "Quadratic Equations" },
    Topic { id: "mat-10-02", subject: "Mathematics", grade: "10", title: "Arithmetic Progressions" },
    Topic { id: "mat-10-03", subject: "Mathematics", grade: "10", title: "Introduction to Trigonometry" },
    Topic { id: "mat-11-01", subject: "Mathematics", grade: "11", title: "Sets and Functions" },
    Topic { id: "mat-11-02", subject: "Mathematics", grade: "11", title: "Sequences and Series" },
    Topic { id: "mat-12-01", subject: "Mathematics", grade: "12", title: "Matrices and Determinants" },
    Topic { id: "mat-12-02", subject: "Mathematics", grade: "12", title: "Differential Calculus" },
    Topic { id: "mat-12-03", subject: "Mathematics", grade: "12", title: "Integral Calculus" },
    Topic { id: "phy-09-01", subject: "Physics", grade: "9", title: "Motion" },
    Topic { id: "phy-09-02", subject: "Physics", grade: "9", title: "Force and Laws of Motion" },
    Topic { id: "phy-10-01", subject: "Physics", grade: "10", title: "Light: Reflection and Refraction" },
    Topic { id: "phy-10-02", subject: "Physics", grade: "10", title: "Electricity" },
    Topic { id: "phy-11-01", subject: "Physics", grade: "11", title: "Kinematics" },
    Topic { id: "phy-11-02", subject: "Physics", grade: "11", title: "Work, Energy and Power" },
    Topic { id: "phy-12-01", subject: "Physics", grade: "12", title: "Electrostatics" },
    Topic { id: "phy-12-02", subject: "Physics", grade: "12", title: "Electromagnetic Induction" },
    Topic { id: "che-09-01", subject: "Chemistry", grade: "9", title: "Matter in Our Surroundings" },
    Topic { id: "che-09-02", subject: "Chemistry", grade: "9", title: "Atoms and Molecules" },
    Topic { id: "che-10-01", subject: "Chemistry", grade: "10", title: "Chemical Reactions and Equations" },
    Topic { id: "che-10-02", subject: "Chemistry", grade: "10", title: "Acids, Bases and Salts" },
    Topic { id: "che-11-01", subject: "Chemistry", grade: "11", title: "Structure of the Atom" },
    Topic { id: "che-11-02", subject: "Chemistry", grade: "11", title: "Chemical Bonding" },
    Topic { id: "che-12-01", subject: "Chemistry", grade: "12", title: "Electrochemistry" },
    Topic { id: "che-12-02", subject: "Chemistry", grade: "12", title: "Organic Chemistry Basics" },
    Topic { id: "bio-09-01", subject: "Biology", grade: "9", title: "The Fundamental Unit of Life" },
    Topic { id: "bio-09-02", subject: "Biology", grade: "9", title: "Tissues" },
    Topic { id: "bio-10-01", subject: "Biology", grade: "10", title: "Life Processes" },
    Topic { id: "bio-10-02", subject: "Biology", grade: "10", title: "Heredity and Evolution" },
    Topic { id: "bio-11-01", subject: "Biology", grade: "11", title: "Cell Structure and Function" },
    Topic { id: "bio-12-01", subject: "Biology", grade: "12", title: "Genetics and Molecular Biology" },
    Topic { id: "eng-09-01", subject: "English", grade: "9", title: "Reading Comprehension" },
    Topic { id: "eng-10-01", subject: "English", grade: "10", title: "Writing Skills" },
    Topic { id: "eng-11-01", subject: "English", grade: "11", title: "Grammar in Context" },
    Topic { id: "eng-12-01", subject: "English", grade: "12", title: "Essay and Report Writing" },
    Topic { id: "cse-09-01", subject: "Computer Science", grade: "9", title: "Introduction to Programming" },
    Topic { id: "cse-10-01", subject: "Computer Science", grade: "10", title: "Flowcharts and Algorithms" },
    Topic { id: "cse-11-01", subject: "Computer Science", grade: "11", title: "Data Structures Basics" },
    Topic { id: "cse-12-01", subject: "Computer Science", grade: "12", title: "Databases and SQL" },
];

pub fn subject_exists(name: &str) -> bool {
    SUBJECTS.iter().any(|s| s.eq_ignore_ascii_case(name))
}

pub fn grade_exists(grade: &str) -> bool {
    GRADES.contains(&grade)
}

/// Canonical subject name for a case-insensitive match.
pub fn canonical_subject(name: &str) -> Option<&'static str> {
    SUBJECTS
        .iter()
        .find(|s| s.eq_ignore_ascii_case(name))
        .copied()
}

pub fn topic_by_id(id: &str) -> Option<&'static Topic> {
    TOPICS.iter().find(|t| t.id == id)
}

pub fn topics_filtered(subject: Option<&str>, grade: Option<&str>) -> Vec<&'static Topic> {
    TOPICS
        .iter()
        .filter(|t| match subject {
            Some(s) => t.subject.eq_ignore_ascii_case(s),
            None => true,
        })
        .filter(|t| match grade {
            Some(g) => t.grade == g,
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_ids_are_unique() {
        let mut ids: Vec<&str> = TOPICS.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), TOPICS.len());
    }

    #[test]
    fn every_topic_references_known_subject_and_grade() {
        for t in TOPICS {
            assert!(subject_exists(t.subject), "unknown subject for {}", t.id);
            assert!(grade_exists(t.grade), "unknown grade for {}", t.id);
        }
    }

    #[test]
    fn filtering_narrows_by_subject_and_grade() {
        let math = topics_filtered(Some("mathematics"), None);
        assert!(!math.is_empty());
        assert!(math.iter().all(|t| t.subject == "Mathematics"));

        let math_12 = topics_filtered(Some("Mathematics"), Some("12"));
        assert!(math_12.iter().all(|t| t.grade == "12"));
        assert!(math_12.len() < math.len());
    }
}
