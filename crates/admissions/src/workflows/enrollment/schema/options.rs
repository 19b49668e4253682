pub const GENDERS: &[&str] = &["Male", "Female", "Other"];

pub const NATIONALITIES: &[&str] = &["Pakistani", "Dual National"];

pub const RELIGIONS: &[&str] = &[
    "Islam",
    "Christianity",
    "Hinduism",
    "Sikhism",
    "Buddhism",
    "Judaism",
    "Other",
];

pub const PROVINCES: &[&str] = &[
    "Punjab",
    "Sindh",
    "Khyber Pakhtunkhwa",
    "Balochistan",
    "Gilgit-Baltistan",
    "Azad Kashmir",
    "Islamabad Capital Territory",
];

pub const DISABILITIES: &[&str] = &["None", "Physical", "Visual", "Hearing", "Other"];

pub const CITIES: &[&str] = &[
    "Karachi",
    "Lahore",
    "Islamabad",
    "Rawalpindi",
    "Peshawar",
    "Quetta",
    "Multan",
    "Faisalabad",
    "Hyderabad",
    "Sialkot",
];

pub const RELATIONSHIPS: &[&str] = &[
    "Father", "Mother", "Brother", "Sister", "Uncle", "Aunt", "Guardian", "Other",
];

pub const EDUCATION_LEVELS: &[&str] = &[
    "Primary",
    "Secondary",
    "Intermediate",
    "Bachelor's",
    "Master's",
    "M.Phil",
    "PhD",
    "Other",
];

pub const MATRIC_SYSTEMS: &[&str] = &["Matriculation", "O-Level", "Other"];

pub const INTER_SYSTEMS: &[&str] = &["Intermediate", "A-Level", "Other"];

pub const BOARDS: &[&str] = &[
    "Karachi Board",
    "Federal Board",
    "Hyderabad Board",
    "Cambridge",
    "Edexcel",
    "Other",
];

pub const GROUPS: &[&str] = &[
    "Science (Pre-Medical)",
    "Science (Pre-Engineering)",
    "Science (Computer Science)",
    "Arts",
    "Commerce",
    "General",
];

pub const MATRIC_RESULT_STATUSES: &[&str] = &["Passed"];

pub const INTER_RESULT_STATUSES: &[&str] = &["Awaited", "Passed", "Supplementary"];

pub const MAX_OBTAINED_MARKS: i64 = 1100;
