//! Column layout of the breast-cancer diagnosis dataset

/// The 30 numeric features, in the dataset's canonical column order.
pub const BREAST_CANCER_FEATURES: [&str; 30] = [
    "mean radius",
    "mean texture",
    "mean perimeter",
    "mean area",
    "mean smoothness",
    "mean compactness",
    "mean concavity",
    "mean concave points",
    "mean symmetry",
    "mean fractal dimension",
    "radius error",
    "texture error",
    "perimeter error",
    "area error",
    "smoothness error",
    "compactness error",
    "concavity error",
    "concave points error",
    "symmetry error",
    "fractal dimension error",
    "worst radius",
    "worst texture",
    "worst perimeter",
    "worst area",
    "worst smoothness",
    "worst compactness",
    "worst concavity",
    "worst concave points",
    "worst symmetry",
    "worst fractal dimension",
];

/// Display names for label 0 and label 1
pub const DEFAULT_TARGET_NAMES: [&str; 2] = ["malignant", "benign"];

/// Raw UCI diagnosis codes, mapped to the numeric labels above
pub const MALIGNANT_CODE: &str = "M";
pub const BENIGN_CODE: &str = "B";
