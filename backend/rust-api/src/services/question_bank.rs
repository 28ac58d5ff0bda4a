use crate::models::quiz::{Question, QuestionSet, QuestionSource};
use crate::models::Subject;

type BankEntry = (&'static str, [&'static str; 4], u8);

const APTITUDE: [BankEntry; 5] = [
    (
        "If the sum of a number and its square is 182, what is the number?",
        ["12", "13", "14", "15"],
        1,
    ),
    (
        "A train running at 54 kmph takes 20 seconds to pass a platform. Next it takes 12 seconds to pass a man walking at 6 kmph in the same direction. Length of train?",
        ["160m", "150m", "140m", "120m"],
        0,
    ),
    (
        "Find the missing number in the series: 2, 6, 12, 20, 30, ?",
        ["40", "42", "44", "46"],
        1,
    ),
    (
        "Average age of A and B is 24. Average age of B, C, D is 22. Sum of ages of A, B, C, D?",
        ["90", "114", "Insufficient data", "88"],
        2,
    ),
    (
        "A bag contains 6 black and 8 white balls. One ball is drawn at random. What is the probability that the ball drawn is white?",
        ["3/4", "4/7", "1/8", "3/7"],
        1,
    ),
];

const DSA: [BankEntry; 5] = [
    (
        "Which data structure uses LIFO principle?",
        ["Queue", "Stack", "Tree", "Graph"],
        1,
    ),
    (
        "Time complexity of binary search?",
        ["O(n)", "O(n log n)", "O(log n)", "O(1)"],
        2,
    ),
    (
        "Which of these is not a balanced tree?",
        ["AVL Tree", "B-Tree", "Red-Black Tree", "Binary Search Tree"],
        3,
    ),
    (
        "Dijkstra's algorithm is used to find:",
        [
            "Minimum spanning tree",
            "Shortest path",
            "Maximum flow",
            "Topological sort",
        ],
        1,
    ),
    (
        "Best case time complexity of Quick Sort?",
        ["O(n)", "O(n log n)", "O(n^2)", "O(1)"],
        1,
    ),
];

const CYBERSECURITY: [BankEntry; 5] = [
    (
        "What does XSS stand for?",
        [
            "XML Script Sequence",
            "Cross-Site Scripting",
            "Cross-Site Styling",
            "External Script Sequence",
        ],
        1,
    ),
    (
        "Which of the following is an asymmetric encryption algorithm?",
        ["AES", "DES", "RSA", "Blowfish"],
        2,
    ),
    (
        "What is the primary function of a firewall?",
        [
            "To find viruses",
            "To monitor and filter network traffic",
            "To speed up internet",
            "To store data",
        ],
        1,
    ),
    (
        "SQL Injection vulnerabilities occur mainly due to:",
        [
            "Weak passwords",
            "Improper input validation",
            "Outdated servers",
            "Open ports",
        ],
        1,
    ),
    (
        "What protocol is used for secure web browsing?",
        ["HTTP", "FTP", "HTTPS", "SMTP"],
        2,
    ),
];

/// The built-in questions for `subject`.
pub fn static_questions(subject: Subject) -> Vec<Question> {
    let entries = match subject {
        Subject::Aptitude => &APTITUDE,
        Subject::Dsa => &DSA,
        Subject::Cybersecurity => &CYBERSECURITY,
    };
    entries
        .iter()
        .map(|(text, options, answer)| Question {
            text: text.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            answer: *answer,
        })
        .collect()
}

pub fn fallback_set(subject: Subject, notice: &str) -> QuestionSet {
    QuestionSet {
        questions: static_questions(subject),
        source: QuestionSource::StaticFallback,
        notice: Some(notice.to_string()),
    }
}
