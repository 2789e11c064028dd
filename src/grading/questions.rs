//! Practice questions and the catalog that serves them.

use crate::error::{CoachError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// How hard a question is; decides the default points it is worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Pro,
}

impl Difficulty {
    /// All difficulties in ascending order.
    pub const ALL: [Difficulty; 4] = [Self::Easy, Self::Medium, Self::Hard, Self::Pro];

    /// Points awarded when a question does not set its own.
    pub fn default_points(&self) -> u32 {
        match self {
            Self::Easy => 10,
            Self::Medium => 20,
            Self::Hard => 30,
            Self::Pro => 50,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::Pro => "Pro",
        }
    }

    /// Parses a difficulty from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            "pro" => Some(Self::Pro),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One exercise with a known-correct reference solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeQuestion {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Starter SQL shown to the learner.
    #[serde(default)]
    pub example_sql: String,
    pub reference_solution: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub category: String,
    /// Overrides the difficulty's default points.
    #[serde(default)]
    pub points: Option<u32>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl PracticeQuestion {
    /// Points awarded for a correct answer.
    pub fn points(&self) -> u32 {
        self.points
            .unwrap_or_else(|| self.difficulty.default_points())
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(rename = "question", default)]
    questions: Vec<PracticeQuestion>,
}

/// Read-only collection of questions, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct QuestionCatalog {
    questions: Vec<PracticeQuestion>,
    index: HashMap<String, usize>,
}

impl QuestionCatalog {
    /// Builds a catalog, rejecting duplicate or blank ids.
    pub fn new(questions: Vec<PracticeQuestion>) -> Result<Self> {
        let mut index = HashMap::with_capacity(questions.len());
        for (i, question) in questions.iter().enumerate() {
            if question.id.trim().is_empty() {
                return Err(CoachError::config(format!(
                    "Question #{} has an empty id",
                    i + 1
                )));
            }
            if index.insert(question.id.clone(), i).is_some() {
                return Err(CoachError::config(format!(
                    "Duplicate question id: {}",
                    question.id
                )));
            }
        }
        Ok(Self { questions, index })
    }

    /// Parses a catalog from TOML made of `[[question]]` tables.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)
            .map_err(|e| CoachError::config(format!("Failed to parse question catalog: {e}")))?;
        Self::new(file.questions)
    }

    /// Loads a TOML catalog from disk.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoachError::config(format!(
                "Failed to read question catalog {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// The built-in catalog, written against the practice dataset.
    pub fn builtin() -> Self {
        let questions = builtin_questions();
        let index = questions
            .iter()
            .enumerate()
            .map(|(i, q)| (q.id.clone(), i))
            .collect();
        Self { questions, index }
    }

    pub fn get(&self, id: &str) -> Option<&PracticeQuestion> {
        self.index.get(id).map(|&i| &self.questions[i])
    }

    pub fn all(&self) -> &[PracticeQuestion] {
        &self.questions
    }

    pub fn by_difficulty(&self, difficulty: Difficulty) -> Vec<&PracticeQuestion> {
        self.questions
            .iter()
            .filter(|q| q.difficulty == difficulty)
            .collect()
    }

    /// Question counts for every difficulty, in ascending order.
    pub fn counts_by_difficulty(&self) -> Vec<(Difficulty, usize)> {
        Difficulty::ALL
            .iter()
            .map(|&d| (d, self.questions.iter().filter(|q| q.difficulty == d).count()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

fn question(
    id: &str,
    title: &str,
    difficulty: Difficulty,
    category: &str,
    description: &str,
    reference_solution: &str,
    hint: &str,
) -> PracticeQuestion {
    PracticeQuestion {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        example_sql: "-- Write your SQL query here\n".to_string(),
        reference_solution: reference_solution.to_string(),
        difficulty,
        category: category.to_string(),
        points: None,
        hint: Some(hint.to_string()),
    }
}

fn builtin_questions() -> Vec<PracticeQuestion> {
    use Difficulty::*;

    vec![
        question(
            "easy_1",
            "Combine Two Tables",
            Easy,
            "Joins",
            "Report the first name, last name, city, and state of each person in the \
             Person table. If a person has no row in the Address table, report NULL \
             for city and state.",
            "SELECT p.firstName, p.lastName, a.city, a.state FROM Person p \
             LEFT JOIN Address a ON p.personId = a.personId",
            "Use LEFT JOIN to include all persons and get NULL for missing addresses.",
        ),
        question(
            "easy_2",
            "Find High Salary Employees",
            Easy,
            "Filtering",
            "Find all employees with a salary greater than 50000.",
            "SELECT * FROM employees WHERE salary > 50000",
            "Use a WHERE clause with the > operator to filter by salary.",
        ),
        question(
            "easy_3",
            "Count Total Employees",
            Easy,
            "Aggregation",
            "Count the total number of employees.",
            "SELECT COUNT(*) FROM employees",
            "Use the COUNT(*) function to count all rows.",
        ),
        question(
            "easy_4",
            "Select Employees from Engineering",
            Easy,
            "Joins",
            "List every column of the employees who work in the Engineering department.",
            "SELECT e.* FROM employees e JOIN departments d ON e.department_id = d.id \
             WHERE d.department_name = 'Engineering'",
            "Use JOIN to connect the tables and WHERE to filter by department name.",
        ),
        question(
            "easy_5",
            "Find Employees Hired After 2020",
            Easy,
            "Filtering",
            "Find all employees hired after 2020-01-01.",
            "SELECT * FROM employees WHERE hire_date > '2020-01-01'",
            "Use a WHERE clause with a date comparison.",
        ),
        question(
            "medium_1",
            "Average Salary by Department",
            Medium,
            "Aggregation",
            "Show each department name with the average salary of its employees \
             as avg_salary.",
            "SELECT d.department_name, AVG(e.salary) AS avg_salary FROM employees e \
             JOIN departments d ON e.department_id = d.id GROUP BY d.id, d.department_name",
            "Use GROUP BY on the department and AVG() to calculate the average salary.",
        ),
        question(
            "medium_2",
            "Top 5 Highest Paid Employees",
            Medium,
            "Sorting",
            "Show the first name, last name, and salary of the five highest paid employees.",
            "SELECT first_name, last_name, salary FROM employees ORDER BY salary DESC LIMIT 5",
            "Use ORDER BY ... DESC to sort by salary and LIMIT to keep the top 5.",
        ),
        question(
            "medium_3",
            "Employees with Names Starting with 'J'",
            Medium,
            "Filtering",
            "Find all employees whose first name starts with the letter J.",
            "SELECT * FROM employees WHERE first_name LIKE 'J%'",
            "Use the LIKE operator with the % wildcard.",
        ),
        question(
            "medium_4",
            "Department Employee Count",
            Medium,
            "Joins",
            "Show every department name with its number of employees as \
             employee_count, including departments with no employees.",
            "SELECT d.department_name, COUNT(e.id) AS employee_count FROM departments d \
             LEFT JOIN employees e ON d.id = e.department_id GROUP BY d.id, d.department_name",
            "Use LEFT JOIN to keep departments with 0 employees and COUNT() on an employee column.",
        ),
        question(
            "medium_5",
            "Employees Hired This Year",
            Medium,
            "Dates",
            "Find all employees hired in the current calendar year.",
            "SELECT * FROM employees WHERE strftime('%Y', hire_date) = strftime('%Y', 'now')",
            "Use strftime('%Y', ...) to extract the year from both the hire date and 'now'.",
        ),
        question(
            "hard_1",
            "Department with Most Employees",
            Hard,
            "Aggregation",
            "Find the department with the most employees; show its name and the count \
             as employee_count.",
            "SELECT d.department_name, COUNT(e.id) AS employee_count FROM departments d \
             JOIN employees e ON d.id = e.department_id GROUP BY d.id, d.department_name \
             ORDER BY employee_count DESC LIMIT 1",
            "Group by department, count employees, order by the count descending, and keep the first row.",
        ),
        question(
            "hard_2",
            "Employees Earning More Than Average",
            Hard,
            "Subqueries",
            "Find all employees whose salary is above the company average.",
            "SELECT * FROM employees WHERE salary > (SELECT AVG(salary) FROM employees)",
            "Compute the average in a subquery and compare against it in WHERE.",
        ),
        question(
            "hard_3",
            "Second Highest Salary",
            Hard,
            "Subqueries",
            "Find the second highest salary in the company.",
            "SELECT MAX(salary) FROM employees WHERE salary < (SELECT MAX(salary) FROM employees)",
            "Find the largest salary that is smaller than the overall maximum.",
        ),
        question(
            "hard_4",
            "Employees with No Manager",
            Hard,
            "Filtering",
            "Find all employees who do not report to a manager.",
            "SELECT * FROM employees WHERE manager_id IS NULL",
            "Use IS NULL; comparing with = NULL never matches.",
        ),
        question(
            "pro_1",
            "Complex Join with Aggregation",
            Pro,
            "Aggregation",
            "For departments with more than two employees, show the department name, \
             employee_count, and avg_salary.",
            "SELECT d.department_name, COUNT(e.id) AS employee_count, AVG(e.salary) AS avg_salary \
             FROM departments d JOIN employees e ON d.id = e.department_id \
             GROUP BY d.id, d.department_name HAVING COUNT(e.id) > 2",
            "Aggregate with GROUP BY and filter the groups with HAVING.",
        ),
        question(
            "pro_2",
            "Window Function - Rank Employees",
            Pro,
            "Window Functions",
            "Rank employees by salary within their department. Show first name, last \
             name, salary, department_id, and salary_rank.",
            "SELECT first_name, last_name, salary, department_id, \
             RANK() OVER (PARTITION BY department_id ORDER BY salary DESC) AS salary_rank \
             FROM employees",
            "Use RANK() with PARTITION BY and ORDER BY in the OVER clause.",
        ),
        question(
            "pro_3",
            "Self Join - Find Manager Hierarchy",
            Pro,
            "Joins",
            "Show each employee's full name as employee_name and their manager's full \
             name as manager_name (NULL when there is no manager).",
            "SELECT e.first_name || ' ' || e.last_name AS employee_name, \
             m.first_name || ' ' || m.last_name AS manager_name \
             FROM employees e LEFT JOIN employees m ON e.manager_id = m.id",
            "Join employees to itself with a LEFT JOIN so employees without managers stay in.",
        ),
        question(
            "pro_4",
            "Running Total of Salaries",
            Pro,
            "Window Functions",
            "Show id, first name, last name, salary, and the running total of salaries \
             ordered by id as running_total.",
            "SELECT id, first_name, last_name, salary, SUM(salary) OVER (ORDER BY id) AS running_total \
             FROM employees ORDER BY id",
            "Use SUM() as a window function with ORDER BY in the OVER clause.",
        ),
    ]
}
