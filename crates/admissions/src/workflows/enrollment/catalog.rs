//! Programs, majors, and campuses on offer, keyed by the applicant's current qualification.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Major {
    pub value: &'static str,
    pub label: &'static str,
    pub seats: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Program {
    pub value: &'static str,
    pub label: &'static str,
    pub duration: &'static str,
    pub credit_hours: u16,
    pub majors: &'static [Major],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Campus {
    pub value: &'static str,
    pub label: &'static str,
    pub address: &'static str,
    pub programs: &'static [&'static str],
}

pub const QUALIFICATIONS: &[&str] = &["intermediate", "alevels", "dae", "bachelors", "masters"];

pub const ADMISSION_TYPES: &[&str] = &["regular", "transfer", "special", "international"];

pub const SHIFTS: &[&str] = &["morning", "evening", "weekend"];

pub const CAMPUSES: &[Campus] = &[
    Campus {
        value: "north",
        label: "North Campus",
        address: "North Campus, Block 6, Gulshan-e-Iqbal, Karachi",
        programs: &["bs", "bba", "ms", "mba"],
    },
    Campus {
        value: "dha",
        label: "DHA Campus (Phase 8) - Main",
        address: "DHA Phase 8, Karachi",
        programs: &["bs", "bba", "bsaf", "ms", "mba", "phd"],
    },
    Campus {
        value: "bahria",
        label: "Bahria Town Campus",
        address: "Bahria Town, Karachi",
        programs: &["bs", "bba"],
    },
    Campus {
        value: "gulshan",
        label: "Gulshan Campus",
        address: "Gulshan-e-Iqbal, Block 4, Karachi",
        programs: &["bs", "bba", "bsaf"],
    },
];

const BS_INTERMEDIATE: Program = Program {
    value: "bs",
    label: "Bachelor of Science (BS)",
    duration: "4 Years",
    credit_hours: 136,
    majors: &[
        Major {
            value: "cs",
            label: "Computer Science",
            seats: 100,
        },
        Major {
            value: "se",
            label: "Software Engineering",
            seats: 80,
        },
        Major {
            value: "ds",
            label: "Data Science",
            seats: 60,
        },
    ],
};

const BBA: Program = Program {
    value: "bba",
    label: "Bachelor of Business Administration (BBA)",
    duration: "4 Years",
    credit_hours: 144,
    majors: &[
        Major {
            value: "marketing",
            label: "Marketing",
            seats: 100,
        },
        Major {
            value: "finance",
            label: "Finance",
            seats: 100,
        },
    ],
};

const BS_ALEVELS: Program = Program {
    value: "bs",
    label: "Bachelor of Science (BS)",
    duration: "4 Years",
    credit_hours: 136,
    majors: &[
        Major {
            value: "cs",
            label: "Computer Science",
            seats: 100,
        },
        Major {
            value: "se",
            label: "Software Engineering",
            seats: 80,
        },
    ],
};

const MS: Program = Program {
    value: "ms",
    label: "Master of Science (MS)",
    duration: "2 Years",
    credit_hours: 30,
    majors: &[
        Major {
            value: "cs",
            label: "Computer Science",
            seats: 40,
        },
        Major {
            value: "se",
            label: "Software Engineering",
            seats: 40,
        },
    ],
};

const MBA: Program = Program {
    value: "mba",
    label: "Master of Business Administration (MBA)",
    duration: "2 Years",
    credit_hours: 36,
    majors: &[
        Major {
            value: "marketing",
            label: "Marketing",
            seats: 50,
        },
        Major {
            value: "finance",
            label: "Finance",
            seats: 50,
        },
    ],
};

/// Programs open to holders of `qualification`. Unknown qualifications offer nothing.
pub fn programs_for(qualification: &str) -> &'static [Program] {
    const INTERMEDIATE: &[Program] = &[BS_INTERMEDIATE, BBA];
    const ALEVELS: &[Program] = &[BS_ALEVELS];
    const BACHELORS: &[Program] = &[MS, MBA];

    match qualification {
        "intermediate" => INTERMEDIATE,
        "alevels" => ALEVELS,
        "bachelors" => BACHELORS,
        _ => &[],
    }
}

pub fn campus(value: &str) -> Option<&'static Campus> {
    CAMPUSES.iter().find(|campus| campus.value == value)
}

pub fn program(qualification: &str, program: &str) -> Option<&'static Program> {
    programs_for(qualification)
        .iter()
        .find(|candidate| candidate.value == program)
}

/// Programs for the qualification, narrowed to those the campus offers when one is chosen.
pub fn available_programs(qualification: &str, campus_value: Option<&str>) -> Vec<&'static Program> {
    let offered = campus_value.and_then(campus);
    programs_for(qualification)
        .iter()
        .filter(|program| match offered {
            Some(campus) => campus.programs.contains(&program.value),
            None => true,
        })
        .collect()
}

pub fn available_majors(qualification: &str, program_value: &str) -> &'static [Major] {
    program(qualification, program_value)
        .map(|program| program.majors)
        .unwrap_or(&[])
}

/// Campuses offering `program_value`; every campus when no program is chosen yet.
pub fn available_campuses(program_value: Option<&str>) -> Vec<&'static Campus> {
    CAMPUSES
        .iter()
        .filter(|campus| match program_value {
            Some(program) => campus.programs.iter().any(|offered| *offered == program),
            None => true,
        })
        .collect()
}

pub fn seats_for(qualification: &str, program_value: &str, major_value: &str) -> u32 {
    available_majors(qualification, program_value)
        .iter()
        .find(|major| major.value == major_value)
        .map(|major| major.seats)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campus_narrows_programs() {
        let all: Vec<_> = available_programs("intermediate", None)
            .into_iter()
            .map(|program| program.value)
            .collect();
        assert_eq!(all, vec!["bs", "bba"]);

        let bachelors_at_bahria = available_programs("bachelors", Some("bahria"));
        assert!(bachelors_at_bahria.is_empty());
    }

    #[test]
    fn campuses_follow_program() {
        let campuses: Vec<_> = available_campuses(Some("mba"))
            .into_iter()
            .map(|campus| campus.value)
            .collect();
        assert_eq!(campuses, vec!["north", "dha"]);
        assert_eq!(available_campuses(None).len(), CAMPUSES.len());
    }

    #[test]
    fn seats_default_to_zero_for_unknown_major() {
        assert_eq!(seats_for("intermediate", "bs", "ds"), 60);
        assert_eq!(seats_for("alevels", "bs", "ds"), 0);
        assert_eq!(seats_for("dae", "bs", "cs"), 0);
    }
}
